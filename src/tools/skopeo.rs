//! Image label inspection via `skopeo inspect`

use super::Inspector;
use super::command::Invocation;
use crate::core::error::{BuilderError, BuilderResult};
use crate::release::imagestream::LabelMap;
use serde::Deserialize;
use std::path::PathBuf;

pub struct Skopeo {
  authfile: Option<PathBuf>,
}

/// Subset of `skopeo inspect` output
#[derive(Debug, Deserialize)]
struct ImageInfo {
  #[serde(rename = "Labels", default)]
  labels: Option<LabelMap>,
}

impl Skopeo {
  pub fn new(authfile: Option<PathBuf>) -> Self {
    Self { authfile }
  }

  fn inspect_invocation(&self, image: &str) -> Invocation {
    Invocation::new("skopeo")
      .arg("inspect")
      .opt_flag("--authfile", self.authfile.as_deref())
      .args(["--no-tags", &format!("docker://{}", image)])
  }
}

impl Inspector for Skopeo {
  fn inspect(&self, image: &str) -> BuilderResult<LabelMap> {
    let stdout = self
      .inspect_invocation(image)
      .run_captured()
      .map_err(|e| BuilderError::Inspection {
        image: image.to_string(),
        reason: e.to_string(),
      })?;

    parse_labels(&stdout).map_err(|reason| BuilderError::Inspection {
      image: image.to_string(),
      reason,
    })
  }
}

fn parse_labels(raw: &[u8]) -> Result<LabelMap, String> {
  let info: ImageInfo = serde_json::from_slice(raw).map_err(|e| format!("malformed inspect output: {}", e))?;
  Ok(info.labels.unwrap_or_default())
}
