//! Disposable working directory for one pipeline run
//!
//! Layout inside the staging root:
//!
//! ```text
//! <root>/
//!   Containerfile
//!   release-manifests/
//!     image-references
//!     release-metadata
//!     ...
//! ```

use crate::core::error::{BuilderError, BuilderResult};
use crate::utils::write_atomic;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Directory inside the release payload image holding its manifests
pub const RELEASE_MANIFESTS_DIR: &str = "release-manifests";
pub const IMAGE_REFERENCES_FILE: &str = "image-references";
pub const RELEASE_METADATA_FILE: &str = "release-metadata";
pub const CONTAINERFILE: &str = "Containerfile";

const STAGING_PREFIX: &str = "dualstream-release-builder";

/// Uniquely named temporary directory, removed when dropped
///
/// Removal failures are logged and otherwise ignored; they cannot affect a
/// run that has already finished or failed.
pub struct StagingDir {
  dir: Option<TempDir>,
  path: PathBuf,
}

impl StagingDir {
  /// Create a fresh staging directory under the system temp dir
  pub fn create() -> BuilderResult<Self> {
    let dir = tempfile::Builder::new()
      .prefix(STAGING_PREFIX)
      .tempdir()
      .map_err(|e| BuilderError::Staging {
        reason: format!("could not create tempdir: {}", e),
      })?;
    Ok(Self::from_tempdir(dir))
  }

  /// Create a fresh staging directory under `parent`
  pub fn create_in(parent: &Path) -> BuilderResult<Self> {
    let dir = tempfile::Builder::new()
      .prefix(STAGING_PREFIX)
      .tempdir_in(parent)
      .map_err(|e| BuilderError::Staging {
        reason: format!("could not create tempdir in {}: {}", parent.display(), e),
      })?;
    Ok(Self::from_tempdir(dir))
  }

  fn from_tempdir(dir: TempDir) -> Self {
    let path = dir.path().to_path_buf();
    debug!("Created staging directory {}", path.display());
    Self { dir: Some(dir), path }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn release_manifests(&self) -> PathBuf {
    self.path.join(RELEASE_MANIFESTS_DIR)
  }

  pub fn image_references(&self) -> PathBuf {
    self.release_manifests().join(IMAGE_REFERENCES_FILE)
  }

  pub fn release_metadata(&self) -> PathBuf {
    self.release_manifests().join(RELEASE_METADATA_FILE)
  }

  pub fn containerfile(&self) -> PathBuf {
    self.path.join(CONTAINERFILE)
  }

  /// Write the build descriptor that layers the staged manifests onto `base_image`
  pub fn write_containerfile(&self, base_image: &str) -> BuilderResult<PathBuf> {
    let path = self.containerfile();
    write_atomic(&path, render_containerfile(base_image).as_bytes()).map_err(|e| BuilderError::Staging {
      reason: format!("could not write Containerfile: {}", e),
    })?;
    Ok(path)
  }
}

impl Drop for StagingDir {
  fn drop(&mut self) {
    if let Some(dir) = self.dir.take()
      && let Err(e) = dir.close()
    {
      warn!("Could not delete tempdir {}: {}", self.path.display(), e);
    }
  }
}

/// Build descriptor: base image, then the release manifests directory
pub fn render_containerfile(base_image: &str) -> String {
  [
    format!("FROM {}", base_image),
    format!("COPY /{0} /{0}", RELEASE_MANIFESTS_DIR),
  ]
  .join("\n")
}
