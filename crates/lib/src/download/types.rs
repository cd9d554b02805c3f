//! Types shared by the download orchestrator and its callers.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use super::prompts::Prompt;
use crate::catalog::{CatalogError, CatalogItem};
use crate::consts::{DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT, NETWORK_PROMPT_MARKER};
use crate::diagnostics::EngineError;
use crate::events::EventBus;
use crate::resolve::{DownloadState, PackageRecord};

/// Configuration for one download batch.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
  pub poll_interval: Duration,
  /// Deadline for each individual wait while preparing.
  pub wait_timeout: Duration,
  pub auto_enable_catalog: bool,
  pub auto_accept_prompts: bool,
  pub prompt_exclusions: Vec<String>,
}

impl Default for DownloadConfig {
  fn default() -> Self {
    Self {
      poll_interval: DEFAULT_POLL_INTERVAL,
      wait_timeout: DEFAULT_WAIT_TIMEOUT,
      auto_enable_catalog: false,
      auto_accept_prompts: true,
      prompt_exclusions: vec![NETWORK_PROMPT_MARKER.to_string()],
    }
  }
}

/// Orchestrator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum OrchestratorState {
  Idle = 0,
  Preparing = 1,
  BatchActive = 2,
  Draining = 3,
  Done = 4,
}

impl OrchestratorState {
  fn from_u8(value: u8) -> Self {
    match value {
      1 => OrchestratorState::Preparing,
      2 => OrchestratorState::BatchActive,
      3 => OrchestratorState::Draining,
      4 => OrchestratorState::Done,
      _ => OrchestratorState::Idle,
    }
  }
}

/// A bounded wait while preparing a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WaitStep {
  SurfaceOpen,
  Teardown,
  Listing,
  Refresh,
}

impl fmt::Display for WaitStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      WaitStep::SurfaceOpen => "the catalog surface to open",
      WaitStep::Teardown => "previous catalog entries to be torn down",
      WaitStep::Listing => "catalog entries to appear",
      WaitStep::Refresh => "the catalog to finish refreshing",
    };
    f.write_str(text)
  }
}

/// Errors that abort a whole batch.
#[derive(Debug, Error)]
pub enum BatchError {
  #[error("catalog service is disabled and auto-enable is off")]
  CatalogUnavailable,

  #[error("timed out after {}ms waiting for {step}", .timeout.as_millis())]
  Timeout { step: WaitStep, timeout: Duration },

  #[error(transparent)]
  Catalog(#[from] CatalogError),

  /// Cancelled or force-finished while preparing.
  #[error("batch interrupted")]
  Interrupted,
}

impl BatchError {
  /// Diagnostic entry for this error, if it should be reported.
  pub fn to_diagnostic(&self) -> Option<EngineError> {
    match self {
      BatchError::CatalogUnavailable => Some(EngineError::CatalogUnavailable(self.to_string())),
      BatchError::Timeout { step, timeout } => Some(EngineError::Timeout {
        step: *step,
        timeout: *timeout,
      }),
      BatchError::Catalog(e) => Some(EngineError::Setup(e.to_string())),
      BatchError::Interrupted => None,
    }
  }
}

#[derive(Debug, Default)]
struct ControlShared {
  cancelled: AtomicBool,
  force_finish: AtomicBool,
  progress: AtomicU32,
  state: AtomicU8,
}

/// Out-of-band control and observation of a running batch.
///
/// Clones share state, so a caller can keep one while the orchestrator runs.
#[derive(Debug, Clone, Default)]
pub struct BatchControl {
  shared: Arc<ControlShared>,
}

impl BatchControl {
  pub fn new() -> Self {
    Self::default()
  }

  /// Abandon the batch: detach in-flight downloads and skip draining.
  pub fn cancel(&self) {
    self.shared.cancelled.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.shared.cancelled.load(Ordering::SeqCst)
  }

  /// Stop polling at the next poll boundary and tear down.
  pub fn force_finish(&self) {
    self.shared.force_finish.store(true, Ordering::SeqCst);
  }

  pub fn is_force_finished(&self) -> bool {
    self.shared.force_finish.load(Ordering::SeqCst)
  }

  pub(crate) fn should_stop(&self) -> bool {
    self.is_cancelled() || self.is_force_finished()
  }

  /// Aggregate progress of the batch, `0.0..=1.0`.
  pub fn progress(&self) -> f32 {
    f32::from_bits(self.shared.progress.load(Ordering::SeqCst))
  }

  pub(crate) fn set_progress(&self, value: f32) {
    self.shared.progress.store(value.to_bits(), Ordering::SeqCst);
  }

  pub fn state(&self) -> OrchestratorState {
    OrchestratorState::from_u8(self.shared.state.load(Ordering::SeqCst))
  }

  pub(crate) fn set_state(&self, state: OrchestratorState) {
    self.shared.state.store(state as u8, Ordering::SeqCst);
  }
}

/// One record handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
  /// Index of the record in its session.
  pub index: usize,
  pub record: PackageRecord,
}

/// Everything the orchestrator needs to run one batch.
#[derive(Debug)]
pub struct DownloadBatch {
  pub generation: u64,
  pub requests: Vec<DownloadRequest>,
  pub control: BatchControl,
  pub events: EventBus,
}

/// What happened to one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
  pub index: usize,
  pub id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub matched: Option<CatalogItem>,
  pub state: DownloadState,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// The catalog lists the package but refuses to serve it.
  pub not_on_hub: bool,
}

impl ItemResult {
  pub(crate) fn new(request: &DownloadRequest) -> Self {
    Self {
      index: request.index,
      id: request.record.id().to_string(),
      matched: None,
      state: DownloadState::NotStarted,
      error: None,
      not_on_hub: false,
    }
  }
}

/// Result of running a batch to `Done`.
#[derive(Debug)]
pub struct BatchOutcome {
  pub generation: u64,
  pub items: Vec<ItemResult>,
  pub diagnostics: Vec<EngineError>,
  /// Set when a phase-scoped error aborted the batch.
  pub failure: Option<BatchError>,
  pub cancelled: bool,
  pub force_finished: bool,
  /// Prompts left for the user after draining.
  pub user_prompts: Vec<Prompt>,
  pub progress: f32,
}

impl BatchOutcome {
  pub fn is_aborted(&self) -> bool {
    self.failure.is_some() || self.cancelled
  }
}
