//! Release metadata via `oc adm release info`

use super::ReleaseInfoProvider;
use super::command::Invocation;
use crate::core::error::{BuilderError, BuilderResult};
use crate::release::info::ReleaseInfo;
use std::path::PathBuf;

pub struct Oc {
  registry_config: Option<PathBuf>,
}

impl Oc {
  pub fn new(registry_config: Option<PathBuf>) -> Self {
    Self { registry_config }
  }

  fn release_info_invocation(&self, pullspec: &str) -> Invocation {
    Invocation::new("oc")
      .args(["adm", "release", "info"])
      .opt_flag("--registry-config", self.registry_config.as_deref())
      .args(["-o=json", pullspec])
  }
}

impl ReleaseInfoProvider for Oc {
  fn release_info(&self, pullspec: &str) -> BuilderResult<ReleaseInfo> {
    let stdout = self
      .release_info_invocation(pullspec)
      .run_captured()
      .map_err(|e| BuilderError::ReleaseInfo {
        pullspec: pullspec.to_string(),
        reason: e.to_string(),
      })?;

    parse_release_info(&stdout, pullspec)
  }
}

fn parse_release_info(raw: &[u8], pullspec: &str) -> BuilderResult<ReleaseInfo> {
  let mut info: ReleaseInfo = serde_json::from_slice(raw).map_err(|e| BuilderError::ReleaseInfo {
    pullspec: pullspec.to_string(),
    reason: format!("malformed release info: {}", e),
  })?;
  info.release_pullspec = pullspec.to_string();
  Ok(info)
}
