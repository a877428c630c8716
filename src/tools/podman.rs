//! Image pull / copy / build / push via `podman`

use super::command::Invocation;
use super::{ImageBuilder, ImageCopier, ImagePusher};
use crate::core::error::{BuilderError, BuilderResult};
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct Podman {
  authfile: Option<PathBuf>,
}

impl Podman {
  pub fn new(authfile: Option<PathBuf>) -> Self {
    Self { authfile }
  }

  /// `podman <subcommands...> [--authfile F]`
  fn preamble(&self, subcommands: &[&str]) -> Invocation {
    Invocation::new("podman")
      .args(subcommands)
      .opt_flag("--authfile", self.authfile.as_deref())
  }

  fn pull(&self, pullspec: &str) -> BuilderResult<()> {
    self
      .preamble(&["pull"])
      .arg(pullspec)
      .run_streaming()
      .map_err(|e| BuilderError::Staging {
        reason: format!("could not pull image {}: {}", pullspec, e),
      })
  }

  fn create_container(&self, pullspec: &str, name: &str) -> BuilderResult<()> {
    // container create does not talk to a registry; no authfile needed
    Invocation::new("podman")
      .args(["container", "create", "--name", name, pullspec])
      .run_streaming()
      .map_err(|e| BuilderError::Staging {
        reason: format!("could not create container {} from pullspec {}: {}", name, pullspec, e),
      })
  }

  fn copy_from_container(&self, name: &str, src_path: &str, dest_dir: &Path) -> BuilderResult<()> {
    Invocation::new("podman")
      .args(["container", "cp", &format!("{}:{}", name, src_path)])
      .arg(dest_dir)
      .run_streaming()
      .map_err(|e| BuilderError::Staging {
        reason: format!("could not copy files from container: {}", e),
      })
  }

  fn delete_container(&self, name: &str) -> BuilderResult<()> {
    Invocation::new("podman")
      .args(["container", "rm", name])
      .run_streaming()
      .map_err(|e| BuilderError::Staging {
        reason: format!("could not delete container {}: {}", name, e),
      })
  }
}

/// Name of the short-lived container used to read files out of an image
fn extractor_name() -> String {
  format!("release-payload-extractor-{}", std::process::id())
}

impl ImageCopier for Podman {
  fn copy_from_image(&self, image: &str, src_path: &str, dest_dir: &Path) -> BuilderResult<()> {
    self.pull(image)?;

    let name = extractor_name();
    self.create_container(image, &name)?;

    let copied = self.copy_from_container(&name, src_path, dest_dir);
    let deleted = self.delete_container(&name);

    match (copied, deleted) {
      (Err(e), Err(cleanup)) => {
        warn!("{}", cleanup);
        Err(e)
      }
      (Err(e), Ok(())) => Err(e),
      (Ok(()), deleted) => deleted,
    }
  }
}

impl ImageBuilder for Podman {
  fn build(&self, target: &str, context_dir: &Path, build_file: &Path) -> BuilderResult<()> {
    self
      .preamble(&["build"])
      .args(["-t", target])
      .arg(format!("--file={}", build_file.display()))
      .arg(context_dir)
      .run_streaming()
      .map_err(|e| BuilderError::Build {
        pullspec: target.to_string(),
        reason: e.to_string(),
      })
  }
}

impl ImagePusher for Podman {
  fn push(&self, target: &str) -> BuilderResult<()> {
    self
      .preamble(&["push"])
      .arg(target)
      .run_streaming()
      .map_err(|e| BuilderError::Push {
        pullspec: target.to_string(),
        reason: e.to_string(),
      })
  }
}
