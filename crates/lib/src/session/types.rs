//! Session phases, options, errors and reports.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::DiagnosticLog;
use crate::download::Prompt;
use crate::manifest::ManifestError;
use crate::resolve::IndexError;

/// Where a session is in its scan / download cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
  #[default]
  Idle,
  Scanning,
  /// Something is missing or needs an update check.
  Pending,
  Downloading,
  /// Downloads are done and backend prompts are being drained.
  Confirmation,
  Finished,
  Failed,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      Phase::Idle => "idle",
      Phase::Scanning => "scanning",
      Phase::Pending => "pending",
      Phase::Downloading => "downloading",
      Phase::Confirmation => "confirmation",
      Phase::Finished => "finished",
      Phase::Failed => "failed",
    };
    f.write_str(text)
  }
}

/// How a scan walks and classifies the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
  /// Descend into each dependency's own `dependencies`.
  pub recursive: bool,
  /// Check `latest` records against the catalog even when nothing is missing.
  pub always_check_for_updates: bool,
}

impl Default for SessionOptions {
  fn default() -> Self {
    Self {
      recursive: true,
      always_check_for_updates: false,
    }
  }
}

#[derive(Debug, Error)]
pub enum SessionError {
  #[error("nothing to download: session is {0}")]
  NothingPending(Phase),

  #[error("no download batch is active")]
  NoActiveBatch,

  #[error("batch {batch} was superseded by a newer scan (current batch {current})")]
  StaleBatch { batch: u64, current: u64 },

  #[error("no manifest found at '{0}'")]
  ManifestNotFound(PathBuf),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Index(#[from] IndexError),
}

/// A record whose version segment could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionIssue {
  pub id: String,
  pub reason: String,
}

/// What a scan found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
  pub phase: Phase,
  pub missing: Vec<String>,
  pub update_needed: Vec<String>,
  pub installed: Vec<String>,
  pub version_errors: Vec<VersionIssue>,
}

impl ScanSummary {
  pub fn total(&self) -> usize {
    self.missing.len() + self.update_needed.len() + self.installed.len() + self.version_errors.len()
  }
}

/// Final classification of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
  /// Every record exists locally and is valid.
  pub success: bool,
  pub installed: Vec<String>,
  pub missing: Vec<String>,
  pub not_on_hub: Vec<String>,
  pub version_errors: Vec<VersionIssue>,
  pub errors: DiagnosticLog,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub user_prompts: Vec<Prompt>,
}
