//! End-to-end dualstream release assembly
//!
//! ```text
//! FetchBaseInfo -> LocateComponentImage -> StageFiles -> BuildSubstituteRefs
//!   -> MutateManifest -> PropagateVersion -> WriteBuildDescriptor
//!   -> BuildImage -> PushImage
//! ```
//!
//! Stages run strictly in order and the first failure aborts the run. All
//! intermediate state lives in the staging directory, which is removed on
//! every exit path, so a failed run can simply be started over. Nothing is
//! published unless every stage before `PushImage` succeeded.

use crate::core::config::ReleaseConfig;
use crate::core::error::{BuilderError, BuilderResult, ResultExt};
use crate::release::info::{CVO_COMPONENT, ReleaseInfo};
use crate::release::labels::SubstituteImage;
use crate::release::manifest::{InsertionOutcome, ReleaseManifest};
use crate::release::staging::{RELEASE_MANIFESTS_DIR, StagingDir};
use crate::release::version::{ReleaseMetadata, propagate_version};
use crate::tools::{ImageBuilder, ImageCopier, ImagePusher, Inspector, ReleaseInfoProvider};
use crate::utils::display_relative;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
  FetchBaseInfo,
  LocateComponentImage,
  StageFiles,
  BuildSubstituteRefs,
  MutateManifest,
  PropagateVersion,
  WriteBuildDescriptor,
  BuildImage,
  PushImage,
}

impl Stage {
  pub fn as_str(self) -> &'static str {
    match self {
      Stage::FetchBaseInfo => "fetch-base-info",
      Stage::LocateComponentImage => "locate-component-image",
      Stage::StageFiles => "stage-files",
      Stage::BuildSubstituteRefs => "build-substitute-refs",
      Stage::MutateManifest => "mutate-manifest",
      Stage::PropagateVersion => "propagate-version",
      Stage::WriteBuildDescriptor => "write-build-descriptor",
      Stage::BuildImage => "build-image",
      Stage::PushImage => "push-image",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// What to assemble
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRequest {
  pub base_release: String,
  pub final_release: String,
  pub substitutes: Vec<SubstituteImage>,
}

impl AssemblyRequest {
  pub fn from_config(config: &ReleaseConfig) -> Self {
    Self {
      base_release: config.base_release.clone(),
      final_release: config.final_release.clone(),
      substitutes: vec![
        SubstituteImage::os_image(config.os_image.clone()),
        SubstituteImage::os_extensions(config.os_extensions_image.clone()),
      ],
    }
  }
}

/// Summary of one assembly run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
  pub base_release: String,
  pub final_release: String,
  pub architecture: String,
  pub component_image: String,
  pub base_version: String,
  pub release_version: String,
  pub insertion: InsertionOutcome,
  /// Rewritten files, relative to the staging root
  pub changed_files: Vec<String>,
  pub dry_run: bool,
  pub published: bool,
}

/// Runs the pipeline against a set of external collaborators
pub struct ReleaseAssembler<'a> {
  release_info: &'a dyn ReleaseInfoProvider,
  inspector: &'a dyn Inspector,
  copier: &'a dyn ImageCopier,
  builder: &'a dyn ImageBuilder,
  pusher: &'a dyn ImagePusher,
  staging_parent: Option<PathBuf>,
  dry_run: bool,
}

impl<'a> ReleaseAssembler<'a> {
  pub fn new(
    release_info: &'a dyn ReleaseInfoProvider,
    inspector: &'a dyn Inspector,
    copier: &'a dyn ImageCopier,
    builder: &'a dyn ImageBuilder,
    pusher: &'a dyn ImagePusher,
  ) -> Self {
    Self {
      release_info,
      inspector,
      copier,
      builder,
      pusher,
      staging_parent: None,
      dry_run: false,
    }
  }

  /// Stop after writing the build descriptor; build and push are skipped
  pub fn dry_run(mut self, dry_run: bool) -> Self {
    self.dry_run = dry_run;
    self
  }

  /// Create staging directories under `parent` instead of the system temp dir
  pub fn staging_parent(mut self, parent: impl Into<PathBuf>) -> Self {
    self.staging_parent = Some(parent.into());
    self
  }

  pub fn assemble(&self, request: &AssemblyRequest) -> BuilderResult<AssemblyReport> {
    let base_info = stage(Stage::FetchBaseInfo, || {
      self.release_info.release_info(&request.base_release)
    })?;

    let component_image = stage(Stage::LocateComponentImage, || {
      locate_component(&base_info, &request.base_release)
    })?;
    info!("Release Pullspec: {}", request.base_release);
    info!("CVO Pullspec: {}", component_image);

    // Dropped on every return path below, which removes the directory
    let staging = stage(Stage::StageFiles, || self.stage_files(&request.base_release))?;

    let new_refs = stage(Stage::BuildSubstituteRefs, || {
      request
        .substitutes
        .iter()
        .map(|s| s.resolve(self.inspector))
        .collect::<BuilderResult<Vec<_>>>()
    })?;

    let insertion = stage(Stage::MutateManifest, || {
      let path = staging.image_references();
      let mut manifest = ReleaseManifest::load(&path)?;
      let outcome = manifest.insert_substitute_references(new_refs)?;
      manifest.save(&path)?;
      debug!("image-references tags: {:?}", manifest.tag_names());
      Ok(outcome)
    })?;

    let (base_version, release_version, changed_files) = stage(Stage::PropagateVersion, || {
      let metadata = ReleaseMetadata::load(&staging.release_metadata())?;
      let (new_version, report) = propagate_version(staging.path(), &metadata.version)?;
      info!(
        "Release version {} written to {} of {} file(s)",
        new_version,
        report.changed_count(),
        report.files.len()
      );
      let changed = report
        .changed()
        .map(|p| display_relative(staging.path(), p))
        .collect::<Vec<_>>();
      Ok((metadata.version, new_version, changed))
    })?;

    let containerfile = stage(Stage::WriteBuildDescriptor, || {
      staging.write_containerfile(&component_image)
    })?;

    let mut report = AssemblyReport {
      base_release: request.base_release.clone(),
      final_release: request.final_release.clone(),
      architecture: base_info.architecture().to_string(),
      component_image,
      base_version,
      release_version,
      insertion,
      changed_files,
      dry_run: self.dry_run,
      published: false,
    };

    if self.dry_run {
      info!("Dry run: skipping build and push of {}", request.final_release);
      return Ok(report);
    }

    stage(Stage::BuildImage, || {
      self.builder.build(&request.final_release, staging.path(), &containerfile)
    })?;

    stage(Stage::PushImage, || self.pusher.push(&request.final_release))?;
    report.published = true;

    info!("Published {} ({})", request.final_release, report.release_version);
    Ok(report)
  }

  fn stage_files(&self, base_release: &str) -> BuilderResult<StagingDir> {
    let staging = match &self.staging_parent {
      Some(parent) => StagingDir::create_in(parent)?,
      None => StagingDir::create()?,
    };

    self
      .copier
      .copy_from_image(base_release, &format!("/{}", RELEASE_MANIFESTS_DIR), staging.path())
      .map_err(|e| match e {
        BuilderError::Staging { .. } => e,
        other => BuilderError::Staging {
          reason: format!("could not copy files from image: {}", other),
        },
      })?;

    Ok(staging)
  }
}

fn stage<T>(stage: Stage, f: impl FnOnce() -> BuilderResult<T>) -> BuilderResult<T> {
  info!("Stage: {}", stage);
  f().in_stage(stage)
}

fn locate_component(info: &ReleaseInfo, base_release: &str) -> BuilderResult<String> {
  info
    .component_pullspec(CVO_COMPONENT)
    .map(str::to_string)
    .ok_or_else(|| BuilderError::ReleaseInfo {
      pullspec: base_release.to_string(),
      reason: format!("release does not have a reference for {}", CVO_COMPONENT),
    })
}
