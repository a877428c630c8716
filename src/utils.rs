//! Filesystem helpers for rewriting staged release files

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `path` with `contents` via a sibling temp file and a rename
///
/// A crash mid-write can orphan the temp file but never leaves a truncated
/// file at `path`. When `path` already exists its permissions are carried
/// over to the replacement.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
  let parent = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  };

  let mut tmp = NamedTempFile::new_in(parent)?;
  tmp.write_all(contents)?;
  tmp.as_file().sync_all()?;

  match fs::metadata(path) {
    Ok(meta) => tmp.as_file().set_permissions(meta.permissions())?,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => return Err(e),
  }

  tmp.persist(path).map_err(|e| e.error)?;
  Ok(())
}

/// Display `path` relative to `root` (e.g. `/release-manifests/0000_cvo.yaml`)
///
/// Falls back to the full path when `path` is not under `root`.
pub fn display_relative(root: &Path, path: &Path) -> String {
  match path.strip_prefix(root) {
    Ok(rel) => format!("/{}", rel.to_string_lossy().replace('\\', "/")),
    Err(_) => path.display().to_string(),
  }
}
