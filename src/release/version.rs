//! Release version propagation across the staged release tree
//!
//! The declared version in `release-metadata` is authoritative. Every file that
//! embeds it is rewritten to carry the dualstream version instead. Occurrences
//! already followed by the dualstream suffix are left alone, so running the
//! propagation twice never stacks suffixes.

use crate::core::error::{BuilderError, BuilderResult};
use crate::utils::{display_relative, write_atomic};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix appended to the base release version
pub const DUALSTREAM_SUFFIX: &str = "-dualstream";

/// The parts of `release-metadata` the builder reads
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseMetadata {
  #[serde(default)]
  pub version: String,
}

impl ReleaseMetadata {
  /// Read the declared version, rejecting a missing or empty one
  pub fn load(path: &Path) -> BuilderResult<Self> {
    let raw = fs::read(path).map_err(|e| BuilderError::VersionMetadata {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })?;

    let metadata: ReleaseMetadata = serde_json::from_slice(&raw).map_err(|e| BuilderError::VersionMetadata {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })?;

    if metadata.version.trim().is_empty() {
      return Err(BuilderError::VersionMetadata {
        path: path.to_path_buf(),
        reason: "no version declared".to_string(),
      });
    }

    Ok(metadata)
  }
}

/// Dualstream version for `version` (unchanged if it already is one)
pub fn derive_version(version: &str) -> String {
  if version.ends_with(DUALSTREAM_SUFFIX) {
    version.to_string()
  } else {
    format!("{}{}", version, DUALSTREAM_SUFFIX)
  }
}

/// Whether one file was rewritten
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
  pub path: PathBuf,
  pub changed: bool,
}

/// Per-file outcome of a propagation run, sorted by path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionPropagationReport {
  pub files: Vec<FileChange>,
}

impl VersionPropagationReport {
  pub fn changed(&self) -> impl Iterator<Item = &Path> {
    self.files.iter().filter(|f| f.changed).map(|f| f.path.as_path())
  }

  pub fn unchanged(&self) -> impl Iterator<Item = &Path> {
    self.files.iter().filter(|f| !f.changed).map(|f| f.path.as_path())
  }

  pub fn changed_count(&self) -> usize {
    self.files.iter().filter(|f| f.changed).count()
  }
}

/// Rewrite every file under `root` that embeds `old_version`
///
/// Returns the new version and a report covering every regular file visited.
/// Any I/O failure aborts the whole run; the tree must then be re-staged.
pub fn propagate_version(root: &Path, old_version: &str) -> BuilderResult<(String, VersionPropagationReport)> {
  let new_version = derive_version(old_version);

  let mut files = Vec::new();
  collect_files(root, &mut files)?;
  files.sort();

  let mut report = VersionPropagationReport::default();
  for path in files {
    let changed = replace_in_file(&path, old_version, &new_version)
      .map_err(|source| BuilderError::PropagationIo { path: path.clone(), source })?;

    if changed {
      info!(
        "Replaced release version to {} in {}",
        new_version,
        display_relative(root, &path)
      );
    } else {
      debug!("No release version in {}", display_relative(root, &path));
    }

    report.files.push(FileChange { path, changed });
  }

  Ok((new_version, report))
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> BuilderResult<()> {
  let entries = fs::read_dir(dir).map_err(|source| BuilderError::PropagationIo {
    path: dir.to_path_buf(),
    source,
  })?;

  for entry in entries {
    let entry = entry.map_err(|source| BuilderError::PropagationIo {
      path: dir.to_path_buf(),
      source,
    })?;
    let path = entry.path();
    let file_type = entry
      .file_type()
      .map_err(|source| BuilderError::PropagationIo { path: path.clone(), source })?;

    if file_type.is_dir() {
      collect_files(&path, out)?;
    } else if file_type.is_file() {
      out.push(path);
    }
  }

  Ok(())
}

/// Replace unpropagated occurrences of `search` in one file; true if rewritten
fn replace_in_file(path: &Path, search: &str, replace: &str) -> io::Result<bool> {
  let contents = fs::read(path)?;

  match replace_version(&contents, search.as_bytes(), replace.as_bytes()) {
    Some(updated) => {
      write_atomic(path, &updated)?;
      Ok(true)
    }
    None => Ok(false),
  }
}

/// Replace every occurrence of `search` not already followed by the suffix
///
/// Works on bytes so files that are not valid UTF-8 are handled too. Returns
/// `None` when nothing would change.
fn replace_version(haystack: &[u8], search: &[u8], replace: &[u8]) -> Option<Vec<u8>> {
  if search.is_empty() || search == replace {
    return None;
  }

  let suffix = DUALSTREAM_SUFFIX.as_bytes();
  let mut out = Vec::with_capacity(haystack.len());
  let mut replaced = false;
  let mut i = 0;

  while i < haystack.len() {
    if haystack[i..].starts_with(search) {
      let after = &haystack[i + search.len()..];
      if after.starts_with(suffix) {
        // Already propagated; copy the whole match including the suffix
        out.extend_from_slice(&haystack[i..i + search.len() + suffix.len()]);
        i += search.len() + suffix.len();
      } else {
        out.extend_from_slice(replace);
        i += search.len();
        replaced = true;
      }
    } else {
      out.push(haystack[i]);
      i += 1;
    }
  }

  replaced.then_some(out)
}
