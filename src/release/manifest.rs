//! Release manifest (`image-references`) mutation
//!
//! The manifest is an ordered list of tag references. New OS tags are spliced
//! in directly after the existing OS entries so related images stay grouped
//! when the file is read.
//!
//! # Marker scan
//!
//! Entries are classified by substring match on their name: anything containing
//! `coreos` is an OS entry, and one that also contains `extensions` is the OS
//! extensions entry. The scan walks the whole list and later matches overwrite
//! earlier ones. A role that never matches is treated as index 0. When only one
//! role is missing this still produces a sensible insertion point, but when both
//! are missing the new tags land after entry 0, which is unlikely to be where an
//! OS image belongs. That case is logged, not rejected.

use crate::core::error::{BuilderError, BuilderResult, ValidationError};
use crate::release::imagestream::{ImageStream, TagReference};
use crate::release::labels::STREAMCLASS;
use crate::utils::write_atomic;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const OS_MARKER: &str = "coreos";
const EXTENSIONS_MARKER: &str = "extensions";

/// Streamclass assumed for the pre-existing OS image when it declares none
pub const DEFAULT_STREAMCLASS: &str = "rhel-9";

/// Indices of the OS marker entries found by [`ReleaseManifest::scan_markers`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MarkerScan {
  pub os_image: Option<usize>,
  pub os_extensions: Option<usize>,
}

impl MarkerScan {
  /// OS image index, defaulting to 0 when no entry matched
  pub fn os_image_index(&self) -> usize {
    self.os_image.unwrap_or(0)
  }

  /// OS extensions index, defaulting to 0 when no entry matched
  pub fn os_extensions_index(&self) -> usize {
    self.os_extensions.unwrap_or(0)
  }

  /// Position right after whichever marker entry comes later
  pub fn insertion_point(&self) -> usize {
    1 + self.os_image_index().max(self.os_extensions_index())
  }
}

/// What [`ReleaseManifest::insert_substitute_references`] did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertionOutcome {
  pub markers: MarkerScan,
  pub insert_point: usize,
  /// Whether the OS image entry received the default streamclass
  pub defaulted_streamclass: bool,
  pub inserted: Vec<String>,
}

/// The `image-references` document of a release
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseManifest {
  stream: ImageStream,
}

impl ReleaseManifest {
  pub fn new(stream: ImageStream) -> Self {
    Self { stream }
  }

  /// Read and decode `image-references`
  pub fn load(path: &Path) -> BuilderResult<Self> {
    let raw = fs::read(path).map_err(|e| BuilderError::ManifestDecode {
      path: path.to_path_buf(),
      reason: format!("could not open imagestream file: {}", e),
    })?;

    Self::from_slice(&raw).map_err(|reason| BuilderError::ManifestDecode {
      path: path.to_path_buf(),
      reason,
    })
  }

  fn from_slice(raw: &[u8]) -> Result<Self, String> {
    let stream: ImageStream = serde_json::from_slice(raw).map_err(|e| e.to_string())?;
    let manifest = Self { stream };

    if let Some(name) = manifest.first_duplicate() {
      return Err(format!("duplicate tag name '{}'", name));
    }

    Ok(manifest)
  }

  /// Encode and atomically replace `image-references`
  pub fn save(&self, path: &Path) -> BuilderResult<()> {
    let encoded = self.to_vec().map_err(|e| BuilderError::ManifestEncode {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })?;

    write_atomic(path, &encoded).map_err(|e| BuilderError::ManifestEncode {
      path: path.to_path_buf(),
      reason: format!("could not move file into place: {}", e),
    })
  }

  pub fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&self.stream)
  }

  pub fn tags(&self) -> &[TagReference] {
    &self.stream.spec.tags
  }

  pub fn tag_names(&self) -> Vec<&str> {
    self.tags().iter().map(|t| t.name.as_str()).collect()
  }

  /// Index of the tag named exactly `name`
  pub fn position(&self, name: &str) -> Option<usize> {
    self.tags().iter().position(|t| t.name == name)
  }

  pub fn get(&self, name: &str) -> Option<&TagReference> {
    self.position(name).map(|i| &self.tags()[i])
  }

  /// Locate the OS image and OS extensions entries (last match wins)
  pub fn scan_markers(&self) -> MarkerScan {
    let mut scan = MarkerScan::default();

    for (i, tag) in self.tags().iter().enumerate() {
      if tag.name.contains(OS_MARKER) {
        if tag.name.contains(EXTENSIONS_MARKER) {
          scan.os_extensions = Some(i);
        } else {
          scan.os_image = Some(i);
        }
      }
    }

    scan
  }

  /// Splice `new_refs` in after the existing OS entries
  ///
  /// Also gives the existing OS image entry the default streamclass when it
  /// has none. On error the manifest is left untouched.
  pub fn insert_substitute_references(&mut self, new_refs: Vec<TagReference>) -> BuilderResult<InsertionOutcome> {
    if self.tags().is_empty() {
      return Err(BuilderError::ManifestDecode {
        path: "image-references".into(),
        reason: "imagestream has no tags".to_string(),
      });
    }
    self.check_new_names(&new_refs)?;

    let markers = self.scan_markers();
    if markers.os_image.is_none() {
      warn!("No OS image tag found in image-references; assuming index 0");
    }
    if markers.os_extensions.is_none() {
      warn!("No OS extensions tag found in image-references; assuming index 0");
    }

    let os_tag = &mut self.stream.spec.tags[markers.os_image_index()];
    let annotations = os_tag.annotations.get_or_insert_with(Default::default);
    let defaulted_streamclass = !annotations.contains_key(STREAMCLASS);
    if defaulted_streamclass {
      annotations.insert(STREAMCLASS.to_string(), DEFAULT_STREAMCLASS.to_string());
      info!("Set {}={} on tag {}", STREAMCLASS, DEFAULT_STREAMCLASS, os_tag.name);
    }

    let insert_point = markers.insertion_point();
    let inserted: Vec<String> = new_refs.iter().map(|t| t.name.clone()).collect();
    self.stream.spec.tags.splice(insert_point..insert_point, new_refs);

    Ok(InsertionOutcome {
      markers,
      insert_point,
      defaulted_streamclass,
      inserted,
    })
  }

  fn check_new_names(&self, new_refs: &[TagReference]) -> BuilderResult<()> {
    let mut seen: HashSet<&str> = self.tags().iter().map(|t| t.name.as_str()).collect();
    for tag in new_refs {
      if !seen.insert(tag.name.as_str()) {
        return Err(BuilderError::Validation(ValidationError::DuplicateTag {
          name: tag.name.clone(),
        }));
      }
    }
    Ok(())
  }

  fn first_duplicate(&self) -> Option<&str> {
    let mut seen = HashSet::new();
    self
      .tags()
      .iter()
      .map(|t| t.name.as_str())
      .find(|name| !seen.insert(*name))
  }
}
