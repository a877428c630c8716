//! Error types for dualstream-release-builder with contextual messages and exit codes
//!
//! Every failure is categorized by the pipeline concern that produced it
//! (inspection, manifest, staging, version propagation, build, push) and, once
//! it crosses the assembler, tagged with the pipeline stage that was running.
//! Each error maps to an exit code and may carry a help message.

use crate::release::assembler::Stage;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for dualstream-release-builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, malformed release content)
  User = 1,
  /// System error (external tools, registry, I/O)
  System = 2,
  /// Validation failure (missing flags, missing binaries, manifest invariants)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for dualstream-release-builder
#[derive(Debug)]
pub enum BuilderError {
  /// Configuration file errors
  Config(ConfigError),

  /// Validation errors (raised before or outside of external calls)
  Validation(ValidationError),

  /// External tool (subprocess) errors
  Tool(ToolError),

  /// Image label inspection failed
  Inspection { image: String, reason: String },

  /// Release info could not be fetched, decoded, or lacks a component
  ReleaseInfo { pullspec: String, reason: String },

  /// image-references could not be read or decoded
  ManifestDecode { path: PathBuf, reason: String },

  /// image-references could not be encoded or written
  ManifestEncode { path: PathBuf, reason: String },

  /// Staging directory creation, population or descriptor write failed
  Staging { reason: String },

  /// release-metadata missing, malformed, or without a version
  VersionMetadata { path: PathBuf, reason: String },

  /// Version rewrite of the staged tree failed
  PropagationIo { path: PathBuf, source: io::Error },

  /// Release image build failed
  Build { pullspec: String, reason: String },

  /// Release image push failed
  Push { pullspec: String, reason: String },

  /// Error raised while a pipeline stage was running
  Staged { stage: Stage, source: Box<BuilderError> },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl BuilderError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    BuilderError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Tag this error with the pipeline stage that produced it
  pub fn in_stage(self, stage: Stage) -> Self {
    match self {
      // Keep the innermost stage; it is the one that actually failed
      BuilderError::Staged { .. } => self,
      other => BuilderError::Staged {
        stage,
        source: Box::new(other),
      },
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      BuilderError::Message { message, context, help } => BuilderError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      BuilderError::Io(err) => BuilderError::Message {
        message: format!("{}: {}", ctx_str, err),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// The pipeline stage this error was raised in, if any
  pub fn stage(&self) -> Option<Stage> {
    match self {
      BuilderError::Staged { stage, .. } => Some(*stage),
      _ => None,
    }
  }

  /// Strip stage tagging and return the underlying error
  pub fn root(&self) -> &BuilderError {
    match self {
      BuilderError::Staged { source, .. } => source.root(),
      other => other,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      BuilderError::Config(_) => ExitCode::User,
      BuilderError::Validation(_) => ExitCode::Validation,
      BuilderError::Tool(_) => ExitCode::System,
      BuilderError::Inspection { .. } => ExitCode::System,
      BuilderError::ReleaseInfo { .. } => ExitCode::System,
      BuilderError::ManifestDecode { .. } => ExitCode::User,
      BuilderError::ManifestEncode { .. } => ExitCode::System,
      BuilderError::Staging { .. } => ExitCode::System,
      BuilderError::VersionMetadata { .. } => ExitCode::User,
      BuilderError::PropagationIo { .. } => ExitCode::System,
      BuilderError::Build { .. } => ExitCode::System,
      BuilderError::Push { .. } => ExitCode::System,
      BuilderError::Staged { source, .. } => source.exit_code(),
      BuilderError::Io(_) => ExitCode::System,
      BuilderError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      BuilderError::Config(e) => e.help_message(),
      BuilderError::Validation(e) => e.help_message(),
      BuilderError::Tool(e) => e.help_message(),
      BuilderError::Inspection { .. } => {
        Some("Check that the image exists and that --src-authfile grants pull access.".to_string())
      }
      BuilderError::PropagationIo { .. } => Some(
        "The staged release tree is in an indeterminate state. Re-run the whole build; nothing was published."
          .to_string(),
      ),
      BuilderError::Build { .. } => Some("Nothing was pushed. Re-run the build once the cause is fixed.".to_string()),
      BuilderError::Push { pullspec, .. } => Some(format!(
        "The state of {} is unknown. Verify it with `skopeo inspect docker://{}` before trusting it.",
        pullspec, pullspec
      )),
      BuilderError::Staged { source, .. } => source.help_message(),
      BuilderError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for BuilderError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuilderError::Config(e) => write!(f, "{}", e),
      BuilderError::Validation(e) => write!(f, "{}", e),
      BuilderError::Tool(e) => write!(f, "{}", e),
      BuilderError::Inspection { image, reason } => {
        write!(f, "Could not inspect image {}: {}", image, reason)
      }
      BuilderError::ReleaseInfo { pullspec, reason } => {
        write!(f, "Could not get release info for {}: {}", pullspec, reason)
      }
      BuilderError::ManifestDecode { path, reason } => {
        write!(f, "Could not decode image references {}: {}", path.display(), reason)
      }
      BuilderError::ManifestEncode { path, reason } => {
        write!(f, "Could not encode image references {}: {}", path.display(), reason)
      }
      BuilderError::Staging { reason } => write!(f, "Staging failed: {}", reason),
      BuilderError::VersionMetadata { path, reason } => {
        write!(f, "Could not read release version from {}: {}", path.display(), reason)
      }
      BuilderError::PropagationIo { path, source } => {
        write!(f, "Could not replace release version in {}: {}", path.display(), source)
      }
      BuilderError::Build { pullspec, reason } => {
        write!(f, "Could not build release image {}: {}", pullspec, reason)
      }
      BuilderError::Push { pullspec, reason } => {
        write!(f, "Could not push release image {}: {}", pullspec, reason)
      }
      BuilderError::Staged { stage, source } => write!(f, "[{}] {}", stage, source),
      BuilderError::Io(e) => write!(f, "I/O error: {}", e),
      BuilderError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for BuilderError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      BuilderError::Io(e) => Some(e),
      BuilderError::PropagationIo { source, .. } => Some(source),
      BuilderError::Staged { source, .. } => Some(source.as_ref()),
      _ => None,
    }
  }
}

impl From<io::Error> for BuilderError {
  fn from(err: io::Error) -> Self {
    BuilderError::Io(err)
  }
}

impl From<String> for BuilderError {
  fn from(msg: String) -> Self {
    BuilderError::message(msg)
  }
}

impl From<&str> for BuilderError {
  fn from(msg: &str) -> Self {
    BuilderError::message(msg)
  }
}

impl From<serde_json::Error> for BuilderError {
  fn from(err: serde_json::Error) -> Self {
    BuilderError::message(format!("JSON error: {}", err))
  }
}

impl From<toml_edit::de::Error> for BuilderError {
  fn from(err: toml_edit::de::Error) -> Self {
    BuilderError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<ToolError> for BuilderError {
  fn from(err: ToolError) -> Self {
    BuilderError::Tool(err)
  }
}

impl From<ValidationError> for BuilderError {
  fn from(err: ValidationError) -> Self {
    BuilderError::Validation(err)
  }
}

/// Configuration-file errors
#[derive(Debug)]
pub enum ConfigError {
  /// Explicitly requested config file does not exist
  NotFound { path: PathBuf },

  /// Config file could not be parsed
  Invalid { path: PathBuf, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => Some(
        "Pass an existing file to --config, or drop the flag to search for dualstream.toml.".to_string(),
      ),
      ConfigError::Invalid { .. } => Some(
        "Valid keys: base_release, os_image, os_extensions_image, final_release, src_authfile, dst_authfile."
          .to_string(),
      ),
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { path } => write!(f, "Config file not found: {}", path.display()),
      ConfigError::Invalid { path, reason } => {
        write!(f, "Invalid config file {}: {}", path.display(), reason)
      }
    }
  }
}

/// Validation errors
#[derive(Debug)]
pub enum ValidationError {
  /// Required setting not supplied by flag or config file
  MissingField { flag: String },

  /// Required external binary not found on PATH
  MissingBinary { binary: String },

  /// A tag name would appear twice in image-references
  DuplicateTag { name: String },
}

impl ValidationError {
  fn help_message(&self) -> Option<String> {
    match self {
      ValidationError::MissingField { flag } => Some(format!(
        "Pass {} on the command line or set it in dualstream.toml.",
        flag
      )),
      ValidationError::MissingBinary { binary } => Some(format!("Install {} and make sure it is on PATH.", binary)),
      ValidationError::DuplicateTag { .. } => {
        Some("The base release may already be a dualstream release. Use a single-stream base release.".to_string())
      }
    }
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationError::MissingField { flag } => write!(f, "must supply {}", flag),
      ValidationError::MissingBinary { binary } => {
        write!(f, "could not find required binary '{}'", binary)
      }
      ValidationError::DuplicateTag { name } => {
        write!(f, "tag '{}' already exists in image-references", name)
      }
    }
  }
}

/// External tool errors
#[derive(Debug)]
pub enum ToolError {
  /// Process could not be started
  SpawnFailed { command: String, reason: String },

  /// Process ran and exited unsuccessfully
  CommandFailed {
    command: String,
    status: Option<i32>,
    stderr: String,
  },
}

impl ToolError {
  fn help_message(&self) -> Option<String> {
    match self {
      ToolError::SpawnFailed { .. } => Some("Check that the tool is installed and executable.".to_string()),
      ToolError::CommandFailed { stderr, .. } => {
        if stderr.contains("unauthorized") || stderr.contains("authentication required") {
          Some("Check the registry credentials passed via --src-authfile / --dst-authfile.".to_string())
        } else {
          None
        }
      }
    }
  }
}

impl fmt::Display for ToolError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ToolError::SpawnFailed { command, reason } => {
        write!(f, "Could not run {}: {}", command, reason)
      }
      ToolError::CommandFailed { command, status, stderr } => {
        match status {
          Some(code) => write!(f, "Command failed with exit code {}: {}", code, command)?,
          None => write!(f, "Command terminated by signal: {}", command)?,
        }
        if !stderr.trim().is_empty() {
          write!(f, "\n{}", stderr.trim_end())?;
        }
        Ok(())
      }
    }
  }
}

/// Result type alias for dualstream-release-builder
pub type BuilderResult<T> = Result<T, BuilderError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> BuilderResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> BuilderResult<T>
  where
    F: FnOnce() -> String;

  /// Tag the error with the pipeline stage that produced it
  fn in_stage(self, stage: Stage) -> BuilderResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<BuilderError>,
{
  fn context(self, ctx: impl Into<String>) -> BuilderResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> BuilderResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }

  fn in_stage(self, stage: Stage) -> BuilderResult<T> {
    self.map_err(|e| e.into().in_stage(stage))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &BuilderError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
