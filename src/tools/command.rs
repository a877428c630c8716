//! Subprocess execution shared by the tool adapters

use crate::core::error::{BuilderResult, ToolError};
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tracing::info;

/// Argument vector for one tool invocation
///
/// Kept as strings so the exact command line can be logged and reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
  args: Vec<String>,
}

impl Invocation {
  pub(crate) fn new(program: &str) -> Self {
    Self {
      args: vec![program.to_string()],
    }
  }

  pub(crate) fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
    self.args.push(arg.as_ref().to_string_lossy().into_owned());
    self
  }

  pub(crate) fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
  {
    for a in args {
      self = self.arg(a);
    }
    self
  }

  /// Append `flag value` when a value is configured
  pub(crate) fn opt_flag(self, flag: &str, value: Option<&Path>) -> Self {
    match value {
      Some(v) if !v.as_os_str().is_empty() => self.arg(flag).arg(v),
      _ => self,
    }
  }

  pub(crate) fn argv(&self) -> &[String] {
    &self.args
  }

  pub(crate) fn display(&self) -> String {
    self.args.join(" ")
  }

  fn command(&self) -> Command {
    let argv = self.argv();
    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]);
    cmd
  }

  /// Run with tool output passed through so progress reaches the user
  ///
  /// Child stdout goes to our stderr; stdout is reserved for the report.
  pub(crate) fn run_streaming(&self) -> BuilderResult<()> {
    info!("Running: {}", self.display());

    let status = self
      .command()
      .stdin(Stdio::null())
      .stdout(io::stderr())
      .status()
      .map_err(|e| ToolError::SpawnFailed {
        command: self.display(),
        reason: e.to_string(),
      })?;

    if !status.success() {
      return Err(
        ToolError::CommandFailed {
          command: self.display(),
          status: status.code(),
          stderr: String::new(),
        }
        .into(),
      );
    }

    Ok(())
  }

  /// Run and collect stdout; stderr is included in the error on failure
  pub(crate) fn run_captured(&self) -> BuilderResult<Vec<u8>> {
    info!("Running: {}", self.display());

    let Output { status, stdout, stderr } = self
      .command()
      .stdin(Stdio::null())
      .output()
      .map_err(|e| ToolError::SpawnFailed {
        command: self.display(),
        reason: e.to_string(),
      })?;

    if !status.success() {
      return Err(
        ToolError::CommandFailed {
          command: self.display(),
          status: status.code(),
          stderr: String::from_utf8_lossy(&stderr).into_owned(),
        }
        .into(),
      );
    }

    Ok(stdout)
  }
}
