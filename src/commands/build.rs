//! Build command implementation

use crate::core::config::{BuildSettings, ReleaseConfig};
use crate::core::error::{BuilderResult, ResultExt};
use crate::release::assembler::{AssemblyReport, AssemblyRequest, ReleaseAssembler};
use crate::tools::{Oc, Podman, REQUIRED_BINARIES, Skopeo, require_binaries};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Flag values for `build`; any of them may also come from the config file
#[derive(Debug, Clone, Default)]
pub struct BuildArgs {
  pub settings: BuildSettings,
  pub config: Option<PathBuf>,
  pub dry_run: bool,
  pub json: bool,
}

/// Run the build command
pub fn run_build(args: BuildArgs) -> BuilderResult<()> {
  let current_dir = env::current_dir().context("Could not determine the current directory")?;

  let config = BuildSettings::load(args.config.as_deref(), &current_dir)?
    .merge(args.settings)
    .validate()?;

  require_binaries(REQUIRED_BINARIES)?;

  let report = assemble(&config, args.dry_run)?;

  if args.json {
    let json = serde_json::to_string_pretty(&report)
      .with_context(|| format!("Could not serialize the report for {}", report.final_release))?;
    println!("{}", json);
  } else {
    print_report(&report);
  }

  Ok(())
}

fn assemble(config: &ReleaseConfig, dry_run: bool) -> BuilderResult<AssemblyReport> {
  let src_auth = Some(config.src_authfile.clone());
  let dst_auth = Some(config.dst_authfile.clone());

  let oc = Oc::new(src_auth.clone());
  let skopeo = Skopeo::new(src_auth.clone());
  // Pull and build read from the source registry; only push needs dst credentials
  let src_podman = Podman::new(src_auth);
  let dst_podman = Podman::new(dst_auth);

  info!("Building dualstream release {} from {}", config.final_release, config.base_release);

  ReleaseAssembler::new(&oc, &skopeo, &src_podman, &src_podman, &dst_podman)
    .dry_run(dry_run)
    .assemble(&AssemblyRequest::from_config(config))
}

fn print_report(report: &AssemblyReport) {
  println!();
  if report.dry_run {
    println!("🔍 Dry-run mode (release not built or pushed)");
  } else {
    println!("✅ Dualstream release published");
  }
  println!();
  println!("📦 {}", report.final_release);
  println!("   Base:          {}", report.base_release);
  println!("   Architecture:  {}", report.architecture);
  println!("   CVO image:     {}", report.component_image);
  println!("   Version:       {} -> {}", report.base_version, report.release_version);

  println!();
  println!("  Inserted at position {}:", report.insertion.insert_point);
  for name in &report.insertion.inserted {
    println!("    + {}", name);
  }
  if report.insertion.defaulted_streamclass {
    println!("    (existing OS tag given the default streamclass)");
  }

  println!();
  if report.changed_files.is_empty() {
    println!("  No files mentioned the release version");
  } else {
    println!("  Version rewritten in {} file(s):", report.changed_files.len());
    for path in &report.changed_files {
      println!("    {}", path);
    }
  }

  if report.dry_run {
    println!();
    println!("Run again without --dry-run to build and push {}", report.final_release);
  }
}
