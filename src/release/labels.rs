//! Substitute OS images and the tag references built from their labels
//!
//! Inspection (an external call) is kept apart from annotation building (a
//! pure function over an already-fetched label map) so the latter can be
//! tested without a registry.

use crate::core::error::{BuilderError, BuilderResult};
use crate::release::imagestream::{LabelMap, TagReference};
use crate::tools::Inspector;
use tracing::warn;

const COMMIT_ID: &str = "io.openshift.build.commit.id";
const COMMIT_REF: &str = "io.openshift.build.commit.ref";
const SOURCE_LOCATION: &str = "io.openshift.build.source-location";
const VERSION_DISPLAY_NAMES: &str = "io.openshift.build.version-display-names";
const VERSIONS: &str = "io.openshift.build.versions";
pub const STREAMCLASS: &str = "io.openshift.os.streamclass";

/// Labels copied from the RHEL 10 OS image into its tag annotations
pub const OS_IMAGE_LABELS: &[&str] = &[
  COMMIT_ID,
  COMMIT_REF,
  SOURCE_LOCATION,
  VERSION_DISPLAY_NAMES,
  VERSIONS,
  STREAMCLASS,
];

/// Labels copied from the RHEL 10 extensions image into its tag annotations
pub const OS_EXTENSIONS_LABELS: &[&str] = &[COMMIT_ID, COMMIT_REF, SOURCE_LOCATION];

pub const OS_IMAGE_TAG: &str = "rhel-coreos-10";
pub const OS_EXTENSIONS_TAG: &str = "rhel-coreos-10-extensions";

/// An image to add to the release, with the tag name and labels it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstituteImage {
  pub tag: &'static str,
  pub label_keys: &'static [&'static str],
  pub pullspec: String,
}

impl SubstituteImage {
  pub fn os_image(pullspec: impl Into<String>) -> Self {
    Self {
      tag: OS_IMAGE_TAG,
      label_keys: OS_IMAGE_LABELS,
      pullspec: pullspec.into(),
    }
  }

  pub fn os_extensions(pullspec: impl Into<String>) -> Self {
    Self {
      tag: OS_EXTENSIONS_TAG,
      label_keys: OS_EXTENSIONS_LABELS,
      pullspec: pullspec.into(),
    }
  }

  /// Inspect the image and build its tag reference
  pub fn resolve(&self, inspector: &dyn Inspector) -> BuilderResult<TagReference> {
    let labels = inspect_labels(inspector, &self.pullspec)?;
    Ok(build_tag_reference(self.tag, &self.pullspec, self.label_keys, &labels))
  }
}

/// Fetch the label map of `image`, tagging failures as inspection errors
pub fn inspect_labels(inspector: &dyn Inspector, image: &str) -> BuilderResult<LabelMap> {
  inspector.inspect(image).map_err(|e| match e {
    BuilderError::Inspection { .. } => e,
    other => BuilderError::Inspection {
      image: image.to_string(),
      reason: other.to_string(),
    },
  })
}

/// Build a tag reference annotated with the requested subset of `labels`
///
/// Every requested key ends up in the annotations. A key the image does not
/// carry is inserted with an empty value and logged at warn, so consumers
/// always see the same annotation key set.
pub fn build_tag_reference(name: &str, image: &str, label_keys: &[&str], labels: &LabelMap) -> TagReference {
  let mut annotations = LabelMap::new();

  for key in label_keys {
    let value = match labels.get(*key) {
      Some(v) => v.clone(),
      None => {
        warn!("Label {:?} not found on image {:?}", key, image);
        String::new()
      }
    };
    annotations.insert((*key).to_string(), value);
  }

  TagReference::docker_image(name, image, annotations)
}
