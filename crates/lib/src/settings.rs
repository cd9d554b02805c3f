//! User settings for scans and download batches.
//!
//! Settings live in `settings.json` under the config directory. Every field is
//! optional in the file; absent fields take their defaults.
//!
//! ```json
//! {
//!   "recursive": true,
//!   "alwaysCheckForUpdates": false,
//!   "autoEnableCatalog": true,
//!   "autoAcceptPrompts": true,
//!   "promptExclusions": ["allow network access"],
//!   "waitTimeoutMs": 5000,
//!   "pollIntervalMs": 100,
//!   "packagesDir": "/games/vam/AddonPackages"
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT, NETWORK_PROMPT_MARKER, SETTINGS_FILENAME};
use crate::download::DownloadConfig;
use crate::platform::paths::{config_dir, packages_dir};
use crate::session::SessionOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
  /// Descend into the nested `dependencies` of each dependency.
  pub recursive: bool,
  /// Check `latest` dependencies against the catalog even when nothing is missing.
  pub always_check_for_updates: bool,
  /// Enable a disabled catalog service instead of aborting the batch.
  pub auto_enable_catalog: bool,
  /// Accept confirmation prompts that are not excluded.
  pub auto_accept_prompts: bool,
  /// Prompts whose text contains one of these markers are always left to the user.
  pub prompt_exclusions: Vec<String>,
  pub wait_timeout_ms: u64,
  pub poll_interval_ms: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub packages_dir: Option<PathBuf>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      recursive: true,
      always_check_for_updates: false,
      auto_enable_catalog: false,
      auto_accept_prompts: true,
      prompt_exclusions: vec![NETWORK_PROMPT_MARKER.to_string()],
      wait_timeout_ms: DEFAULT_WAIT_TIMEOUT.as_millis() as u64,
      poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
      packages_dir: None,
    }
  }
}

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("failed to read settings file '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse settings file '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid setting '{field}': {reason}")]
  Invalid { field: &'static str, reason: String },
}

impl Settings {
  /// Path of the settings file in the user's config directory.
  pub fn default_path() -> PathBuf {
    config_dir().join(SETTINGS_FILENAME)
  }

  /// Load settings from the default location, falling back to defaults.
  pub fn load_default() -> Result<Self, SettingsError> {
    Self::load(&Self::default_path()).map(Option::unwrap_or_default)
  }

  /// Load settings from `path`.
  ///
  /// Returns `Ok(None)` if the file doesn't exist.
  pub fn load(path: &Path) -> Result<Option<Self>, SettingsError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(None);
      }
      Err(e) => {
        return Err(SettingsError::Read {
          path: path.to_path_buf(),
          source: e,
        });
      }
    };

    let settings: Settings = serde_json::from_str(&content).map_err(|e| SettingsError::Parse {
      path: path.to_path_buf(),
      source: e,
    })?;
    settings.validate()?;

    debug!(path = %path.display(), "loaded settings");
    Ok(Some(settings))
  }

  fn validate(&self) -> Result<(), SettingsError> {
    if self.poll_interval_ms == 0 {
      return Err(SettingsError::Invalid {
        field: "pollIntervalMs",
        reason: "must be greater than zero".to_string(),
      });
    }
    if self.wait_timeout_ms < self.poll_interval_ms {
      return Err(SettingsError::Invalid {
        field: "waitTimeoutMs",
        reason: format!("must be at least pollIntervalMs ({})", self.poll_interval_ms),
      });
    }
    Ok(())
  }

  /// Packages directory, honoring the settings file before the environment default.
  pub fn packages_dir(&self) -> PathBuf {
    self.packages_dir.clone().unwrap_or_else(packages_dir)
  }

  pub fn session_options(&self) -> SessionOptions {
    SessionOptions {
      recursive: self.recursive,
      always_check_for_updates: self.always_check_for_updates,
    }
  }

  pub fn download_config(&self) -> DownloadConfig {
    DownloadConfig {
      poll_interval: Duration::from_millis(self.poll_interval_ms),
      wait_timeout: Duration::from_millis(self.wait_timeout_ms),
      auto_enable_catalog: self.auto_enable_catalog,
      auto_accept_prompts: self.auto_accept_prompts,
      prompt_exclusions: self.prompt_exclusions.clone(),
    }
  }
}
