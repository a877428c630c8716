mod commands;
mod core;
mod release;
mod tools;
mod utils;

use clap::{Args, Parser, Subcommand};
use commands::BuildArgs;
use core::config::BuildSettings;
use core::error::{BuilderError, print_error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Build OpenShift releases that carry both RHEL 9 and RHEL 10 CoreOS images
#[derive(Parser)]
#[command(name = "dualstream-release-builder")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Assemble a dualstream release and push it
  Build {
    #[command(flatten)]
    flags: BuildFlags,
    /// Read settings from this TOML file (default: search dualstream.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stage and rewrite the release but skip build and push
    #[arg(long)]
    dry_run: bool,
    /// Output the report in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Summarize a release payload
  Info {
    /// Release image pullspec
    pullspec: String,
    /// Registry authfile for pulling release metadata
    #[arg(long)]
    authfile: Option<PathBuf>,
    /// Output the summary in JSON format
    #[arg(long)]
    json: bool,
  },
}

#[derive(Args)]
struct BuildFlags {
  /// Base release pullspec
  #[arg(long)]
  base_release: Option<String>,
  /// RHEL 10 CoreOS image pullspec
  #[arg(long = "rhel10-pullspec")]
  rhel10_pullspec: Option<String>,
  /// RHEL 10 CoreOS extensions image pullspec
  #[arg(long = "rhel10-ext-pullspec")]
  rhel10_ext_pullspec: Option<String>,
  /// Pullspec to build and push the dualstream release as
  #[arg(long = "final-release-pullspec")]
  final_release_pullspec: Option<String>,
  /// Authfile for the source registries
  #[arg(long)]
  src_authfile: Option<PathBuf>,
  /// Authfile for the destination registry
  #[arg(long)]
  dst_authfile: Option<PathBuf>,
}

impl From<BuildFlags> for BuildSettings {
  fn from(flags: BuildFlags) -> Self {
    BuildSettings {
      base_release: flags.base_release,
      os_image: flags.rhel10_pullspec,
      os_extensions_image: flags.rhel10_ext_pullspec,
      final_release: flags.final_release_pullspec,
      src_authfile: flags.src_authfile,
      dst_authfile: flags.dst_authfile,
    }
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_logging();

  let result = match cli.command {
    Commands::Build {
      flags,
      config,
      dry_run,
      json,
    } => commands::run_build(BuildArgs {
      settings: flags.into(),
      config,
      dry_run,
      json,
    }),
    Commands::Info { pullspec, authfile, json } => commands::run_info(&pullspec, authfile, json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: BuilderError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
