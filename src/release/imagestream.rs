//! Serde model of the OpenShift `ImageStream` document
//!
//! Only the fields the builder reads or writes are typed. Everything else is
//! captured in flattened `extra` maps so a load/save cycle keeps fields this
//! crate does not know about (metadata, lookupPolicy, importPolicy, ...).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Label / annotation map. Sorted so serialized output is reproducible.
pub type LabelMap = BTreeMap<String, String>;

/// `kind` used for image references to a registry pullspec
pub const DOCKER_IMAGE_KIND: &str = "DockerImage";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageStream {
  #[serde(default)]
  pub spec: ImageStreamSpec,

  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageStreamSpec {
  #[serde(default, deserialize_with = "null_as_empty")]
  pub tags: Vec<TagReference>,

  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// One named entry of the release manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagReference {
  pub name: String,

  /// `None` round-trips an explicit `null` / missing map
  #[serde(default)]
  pub annotations: Option<LabelMap>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub from: Option<ObjectReference>,

  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectReference {
  #[serde(default)]
  pub kind: String,

  #[serde(default)]
  pub name: String,

  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl TagReference {
  /// Tag pointing at a registry pullspec
  pub fn docker_image(name: impl Into<String>, pullspec: impl Into<String>, annotations: LabelMap) -> Self {
    Self {
      name: name.into(),
      annotations: Some(annotations),
      from: Some(ObjectReference {
        kind: DOCKER_IMAGE_KIND.to_string(),
        name: pullspec.into(),
        extra: Map::new(),
      }),
      extra: Map::new(),
    }
  }

  /// Pullspec this tag points at, if any
  pub fn source_image(&self) -> Option<&str> {
    self.from.as_ref().map(|f| f.name.as_str()).filter(|n| !n.is_empty())
  }

  pub fn annotation(&self, key: &str) -> Option<&str> {
    self.annotations.as_ref().and_then(|a| a.get(key)).map(String::as_str)
  }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
  D: serde::Deserializer<'de>,
  T: Deserialize<'de>,
{
  Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
