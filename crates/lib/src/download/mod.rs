//! Download orchestration.
//!
//! This module runs one batch of catalog downloads for the records a scan
//! found missing or out of date. It handles:
//! - Preparing the catalog service with bounded waits
//! - Starting and polling per-record download handles
//! - Aggregating monotonic batch progress
//! - Sweeping confirmation prompts raised by the backend
//!
//! # Modules
//!
//! - [`clock`] - Injected time source
//! - [`orchestrator`] - The batch state machine
//! - [`progress`] - Per-record progress contributions
//! - [`prompts`] - Confirmation surface and the shared prompt board
//! - [`sweeper`] - Auto-accepting prompts
//! - [`types`] - Batch configuration, control and outcome types

pub mod clock;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
pub mod sweeper;
pub mod types;

pub use clock::{Clock, TokioClock, VirtualClock};
pub use orchestrator::DownloadOrchestrator;
pub use progress::BatchProgress;
pub use prompts::{AcceptAction, ConfirmationSurface, Prompt, PromptBoard, PromptError, PromptId};
pub use sweeper::{ConfirmationSweeper, SweepPass};
pub use types::{
  BatchControl, BatchError, BatchOutcome, DownloadBatch, DownloadConfig, DownloadRequest, ItemResult,
  OrchestratorState, WaitStep,
};
