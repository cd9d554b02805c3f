//! Accumulated engine errors.
//!
//! Record-scoped problems never abort a batch; they are collected here along
//! with any phase-scoped failure and handed back to the caller verbatim.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::catalog::MatchError;
use crate::download::WaitStep;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
  /// The version segment of a spec is neither an integer nor `latest`.
  #[error("{reason}")]
  VersionFormat { id: String, reason: String },

  /// The catalog service is disabled and may not be enabled.
  #[error("{0}")]
  CatalogUnavailable(String),

  #[error("timed out after {}ms waiting for {step}", .timeout.as_millis())]
  Timeout { step: WaitStep, timeout: Duration },

  /// Unexpected failure while setting up a batch.
  #[error("batch setup failed: {0}")]
  Setup(String),

  #[error(transparent)]
  Match(#[from] MatchError),

  #[error("download of '{id}' failed: {reason}")]
  Download { id: String, reason: String },

  #[error("'{id}' is on the Hub but cannot be downloaded")]
  NotOnHub { id: String },

  #[error("prompt could not be answered: {0}")]
  Prompt(String),
}

impl EngineError {
  /// Whether this error aborted its batch.
  pub fn is_phase_scoped(&self) -> bool {
    matches!(
      self,
      EngineError::CatalogUnavailable(_) | EngineError::Timeout { .. } | EngineError::Setup(_)
    )
  }
}

impl Serialize for EngineError {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// Ordered log of everything that went wrong in a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DiagnosticLog {
  entries: Vec<EngineError>,
}

impl DiagnosticLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, error: EngineError) {
    self.entries.push(error);
  }

  pub fn extend(&mut self, errors: impl IntoIterator<Item = EngineError>) {
    self.entries.extend(errors);
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  pub fn entries(&self) -> &[EngineError] {
    &self.entries
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }
}

impl fmt::Display for DiagnosticLog {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for entry in &self.entries {
      writeln!(f, "{}", entry)?;
    }
    Ok(())
  }
}
