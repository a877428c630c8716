//! Info command implementation

use crate::core::error::{BuilderError, BuilderResult};
use crate::release::info::{CVO_COMPONENT, ReleaseInfo};
use crate::release::manifest::ReleaseManifest;
use crate::tools::{Oc, ReleaseInfoProvider, require_binaries};
use serde::Serialize;
use std::path::PathBuf;

/// Summary printed by `info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseSummary {
  pub pullspec: String,
  pub architecture: String,
  pub version: String,
  pub cvo_pullspec: Option<String>,
  pub machine_os: Option<String>,
  pub os_image_tag: Option<String>,
  pub os_extensions_tag: Option<String>,
}

impl ReleaseSummary {
  pub fn from_info(info: &ReleaseInfo) -> Self {
    let manifest = ReleaseManifest::new(info.references.clone().unwrap_or_default());
    let markers = manifest.scan_markers();
    let tag_name = |idx: Option<usize>| idx.and_then(|i| manifest.tags().get(i)).map(|t| t.name.clone());

    Self {
      pullspec: info.release_pullspec.clone(),
      architecture: info.architecture().to_string(),
      version: info.version().to_string(),
      cvo_pullspec: info.component_pullspec(CVO_COMPONENT).map(str::to_string),
      machine_os: info.machine_os_short_version(),
      os_image_tag: tag_name(markers.os_image),
      os_extensions_tag: tag_name(markers.os_extensions),
    }
  }
}

/// Run the info command
pub fn run_info(pullspec: &str, authfile: Option<PathBuf>, json: bool) -> BuilderResult<()> {
  require_binaries(&["oc"])?;

  let info = Oc::new(authfile).release_info(pullspec)?;
  let summary = ReleaseSummary::from_info(&info);

  if json {
    println!(
      "{}",
      serde_json::to_string_pretty(&summary).map_err(|e| BuilderError::message(format!("Serialization error: {}", e)))?
    );
  } else {
    print_summary(&summary);
  }

  Ok(())
}

fn print_summary(summary: &ReleaseSummary) {
  let or_none = |v: &Option<String>| v.clone().unwrap_or_else(|| "(none)".to_string());

  println!("📦 {}", summary.pullspec);
  println!("   Architecture:   {}", summary.architecture);
  println!("   Version:        {}", summary.version);
  println!("   CVO image:      {}", or_none(&summary.cvo_pullspec));
  println!("   Machine OS:     {}", or_none(&summary.machine_os));
  println!("   OS tag:         {}", or_none(&summary.os_image_tag));
  println!("   Extensions tag: {}", or_none(&summary.os_extensions_tag));
}
