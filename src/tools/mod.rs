//! External container tooling behind narrow traits
//!
//! The pipeline only talks to these traits. The subprocess-backed
//! implementations ([`Oc`], [`Podman`], [`Skopeo`]) each take their registry
//! credentials at construction time.

mod command;
pub mod oc;
pub mod podman;
pub mod skopeo;

pub use oc::Oc;
pub use podman::Podman;
pub use skopeo::Skopeo;

use crate::core::error::{BuilderError, BuilderResult, ValidationError};
use crate::release::imagestream::LabelMap;
use crate::release::info::ReleaseInfo;
use std::env;
use std::path::{Path, PathBuf};

/// Binaries a build run shells out to
pub const REQUIRED_BINARIES: &[&str] = &["oc", "podman", "skopeo"];

/// Reads the labels of an image
pub trait Inspector {
  fn inspect(&self, image: &str) -> BuilderResult<LabelMap>;
}

/// Materializes a directory from inside an image into a local directory
pub trait ImageCopier {
  fn copy_from_image(&self, image: &str, src_path: &str, dest_dir: &Path) -> BuilderResult<()>;
}

/// Builds and tags an image from a local context
pub trait ImageBuilder {
  fn build(&self, target: &str, context_dir: &Path, build_file: &Path) -> BuilderResult<()>;
}

/// Publishes a locally built image
pub trait ImagePusher {
  fn push(&self, target: &str) -> BuilderResult<()>;
}

/// Fetches release metadata for a release pullspec
pub trait ReleaseInfoProvider {
  fn release_info(&self, pullspec: &str) -> BuilderResult<ReleaseInfo>;
}

/// Locate `binary` on PATH
pub fn find_on_path(binary: &str) -> Option<PathBuf> {
  let path = env::var_os("PATH")?;
  env::split_paths(&path)
    .map(|dir| dir.join(binary))
    .find(|candidate| is_executable(candidate))
}

/// Fail with a validation error for the first required binary not on PATH
pub fn require_binaries(binaries: &[&str]) -> BuilderResult<()> {
  for binary in binaries {
    if find_on_path(binary).is_none() {
      return Err(BuilderError::Validation(ValidationError::MissingBinary {
        binary: binary.to_string(),
      }));
    }
  }
  Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;
  path
    .metadata()
    .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
  path.is_file() || path.with_extension("exe").is_file()
}
