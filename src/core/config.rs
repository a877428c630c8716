use crate::core::error::{BuilderError, BuilderResult, ConfigError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for a dualstream build, as read from a config file or flags.
/// Searched in order: dualstream.toml, .dualstream.toml, .config/dualstream.toml
///
/// Every field is optional here; [`BuildSettings::validate`] turns a merged
/// set into a [`ReleaseConfig`] with all fields present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSettings {
  /// Base release image pullspec
  #[serde(default)]
  pub base_release: Option<String>,

  /// RHEL 10 OS image pullspec
  #[serde(default)]
  pub os_image: Option<String>,

  /// RHEL 10 extensions image pullspec
  #[serde(default)]
  pub os_extensions_image: Option<String>,

  /// Pullspec the dualstream release is built as and pushed to
  #[serde(default)]
  pub final_release: Option<String>,

  /// Registry authfile used to pull the base release and inspect images
  #[serde(default)]
  pub src_authfile: Option<PathBuf>,

  /// Registry authfile used to push the final release
  #[serde(default)]
  pub dst_authfile: Option<PathBuf>,
}

/// Fully validated configuration for one pipeline run.
///
/// Credentials live here and are handed to each tool constructor; nothing
/// reads them from process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseConfig {
  pub base_release: String,
  pub os_image: String,
  pub os_extensions_image: String,
  pub final_release: String,
  pub src_authfile: PathBuf,
  pub dst_authfile: PathBuf,
}

impl BuildSettings {
  /// Find config file in search order
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("dualstream.toml"),
      path.join(".dualstream.toml"),
      path.join(".config").join("dualstream.toml"),
    ];

    candidates.into_iter().find(|p| p.is_file())
  }

  /// Load settings from an explicit file, or search `dir` for one.
  ///
  /// A missing file is only an error when it was requested explicitly.
  pub fn load(explicit: Option<&Path>, dir: &Path) -> BuilderResult<Self> {
    let config_path = match explicit {
      Some(path) => {
        if !path.is_file() {
          return Err(BuilderError::Config(ConfigError::NotFound {
            path: path.to_path_buf(),
          }));
        }
        path.to_path_buf()
      }
      None => match Self::find_config_path(dir) {
        Some(path) => path,
        None => return Ok(Self::default()),
      },
    };

    Self::from_file(&config_path)
  }

  /// Parse settings from a TOML file
  pub fn from_file(path: &Path) -> BuilderResult<Self> {
    let content = fs::read_to_string(path).map_err(|e| {
      BuilderError::Config(ConfigError::Invalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
      })
    })?;

    toml_edit::de::from_str(&content).map_err(|e| {
      BuilderError::Config(ConfigError::Invalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
      })
    })
  }

  /// Overlay `other` on top of `self`; fields set in `other` win
  pub fn merge(self, other: BuildSettings) -> Self {
    Self {
      base_release: other.base_release.or(self.base_release),
      os_image: other.os_image.or(self.os_image),
      os_extensions_image: other.os_extensions_image.or(self.os_extensions_image),
      final_release: other.final_release.or(self.final_release),
      src_authfile: other.src_authfile.or(self.src_authfile),
      dst_authfile: other.dst_authfile.or(self.dst_authfile),
    }
  }

  /// Check every required setting is present (and non-empty)
  ///
  /// Fields are checked in flag order so the first missing one is reported.
  pub fn validate(self) -> BuilderResult<ReleaseConfig> {
    Ok(ReleaseConfig {
      base_release: require_str(self.base_release, "--base-release")?,
      os_image: require_str(self.os_image, "--rhel10-pullspec")?,
      os_extensions_image: require_str(self.os_extensions_image, "--rhel10-ext-pullspec")?,
      final_release: require_str(self.final_release, "--final-release-pullspec")?,
      src_authfile: require_path(self.src_authfile, "--src-authfile")?,
      dst_authfile: require_path(self.dst_authfile, "--dst-authfile")?,
    })
  }
}

fn require_str(value: Option<String>, flag: &str) -> BuilderResult<String> {
  match value {
    Some(v) if !v.trim().is_empty() => Ok(v),
    _ => Err(missing(flag)),
  }
}

fn require_path(value: Option<PathBuf>, flag: &str) -> BuilderResult<PathBuf> {
  match value {
    Some(p) if !p.as_os_str().is_empty() => Ok(p),
    _ => Err(missing(flag)),
  }
}

fn missing(flag: &str) -> BuilderError {
  BuilderError::Validation(ValidationError::MissingField { flag: flag.to_string() })
}
