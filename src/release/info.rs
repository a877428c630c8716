//! Release info as reported by `oc adm release info -o=json`

use crate::release::imagestream::{ImageStream, TagReference};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Component whose image the release payload is built from
pub const CVO_COMPONENT: &str = "cluster-version-operator";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
  #[serde(default)]
  pub config: ImageConfig,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub image: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub digest: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub content_digest: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub list_digest: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub references: Option<ImageStream>,

  /// Not part of `oc` output; set to the pullspec that was queried
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub release_pullspec: String,

  #[serde(default)]
  pub metadata: Metadata,

  #[serde(default)]
  pub display_versions: BTreeMap<String, DisplayVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub architecture: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub created: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub kind: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub version: String,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub previous: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayVersion {
  // oc emits these capitalized
  #[serde(default, alias = "Version")]
  pub version: String,

  #[serde(default, alias = "DisplayName", skip_serializing_if = "String::is_empty")]
  pub display_name: String,
}

impl ReleaseInfo {
  pub fn architecture(&self) -> &str {
    &self.config.architecture
  }

  pub fn version(&self) -> &str {
    &self.metadata.version
  }

  pub fn tags(&self) -> &[TagReference] {
    self.references.as_ref().map(|r| r.spec.tags.as_slice()).unwrap_or(&[])
  }

  /// Tag reference of the component named exactly `name`
  pub fn tag_ref_for_component(&self, name: &str) -> Option<&TagReference> {
    self.tags().iter().find(|t| t.name == name)
  }

  /// Pullspec of the component named exactly `name`
  pub fn component_pullspec(&self, name: &str) -> Option<&str> {
    self.tag_ref_for_component(name).and_then(TagReference::source_image)
  }

  /// `major.minor` of the machine-os display version, e.g. `9.6`
  pub fn machine_os_short_version(&self) -> Option<String> {
    let version = &self.display_versions.get("machine-os")?.version;
    let mut parts = version.split('.');
    match (parts.next(), parts.next()) {
      (Some(major), Some(minor)) if !major.is_empty() && !minor.is_empty() => Some(format!("{}.{}", major, minor)),
      _ => None,
    }
  }
}
