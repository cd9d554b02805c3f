//! Resolution sessions.
//!
//! A session sequences one "identify dependencies" cycle:
//!
//! 1. [`scan`](ResolutionSession::scan) walks a manifest, classifies every
//!    spec, checks local presence and partitions the records into buckets
//! 2. [`start_download`](ResolutionSession::start_download) hands the
//!    actionable records to a [`DownloadOrchestrator`](crate::download::DownloadOrchestrator)
//!    as a [`DownloadBatch`]
//! 3. [`finish`](ResolutionSession::finish) applies the batch outcome,
//!    re-checks local presence and produces the [`FinalReport`]
//!
//! Scanning again while a batch runs cancels that batch. Its outcome is
//! rejected by `finish` because it carries an older generation.

mod types;

use std::path::Path;

use tracing::{debug, info, warn};

pub use types::{FinalReport, Phase, ScanSummary, SessionError, SessionOptions, VersionIssue};

use crate::diagnostics::{DiagnosticLog, EngineError};
use crate::download::{BatchControl, BatchError, BatchOutcome, DownloadBatch, DownloadRequest, OrchestratorState, Prompt};
use crate::events::{EventBus, SessionEvent, Subscription};
use crate::manifest::{Manifest, ManifestSource, ManifestWalker};
use crate::resolve::{Bucket, Buckets, LocalInstallChecker, LocalPackageIndex, PackageRecord};

/// One scan / download cycle over a manifest.
pub struct ResolutionSession {
  options: SessionOptions,
  index: Box<dyn LocalPackageIndex>,
  phase: Phase,
  records: Vec<PackageRecord>,
  buckets: Buckets,
  not_on_hub: Vec<usize>,
  diagnostics: DiagnosticLog,
  events: EventBus,
  generation: u64,
  active: Option<BatchControl>,
  /// Progress at the end of the last cycle.
  final_progress: f32,
  report: Option<FinalReport>,
}

impl ResolutionSession {
  pub fn new(index: Box<dyn LocalPackageIndex>, options: SessionOptions) -> Self {
    Self {
      options,
      index,
      phase: Phase::Idle,
      records: Vec::new(),
      buckets: Buckets::default(),
      not_on_hub: Vec::new(),
      diagnostics: DiagnosticLog::new(),
      events: EventBus::new(),
      generation: 0,
      active: None,
      final_progress: 0.0,
      report: None,
    }
  }

  pub fn options(&self) -> &SessionOptions {
    &self.options
  }

  /// Current phase. A batch that is draining prompts reports `Confirmation`.
  pub fn phase(&self) -> Phase {
    match (&self.active, self.phase) {
      (Some(control), Phase::Downloading) if control.state() == OrchestratorState::Draining => Phase::Confirmation,
      (_, phase) => phase,
    }
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn records(&self) -> &[PackageRecord] {
    &self.records
  }

  pub fn buckets(&self) -> &Buckets {
    &self.buckets
  }

  pub fn diagnostics(&self) -> &DiagnosticLog {
    &self.diagnostics
  }

  /// The report of the last completed cycle.
  pub fn report(&self) -> Option<&FinalReport> {
    self.report.as_ref()
  }

  pub fn subscribe(&self) -> Subscription {
    self.events.subscribe()
  }

  /// Aggregate progress of the current cycle, `0.0..=1.0`.
  pub fn progress(&self) -> f32 {
    match (&self.active, self.phase) {
      (Some(control), _) => control.progress(),
      (None, Phase::Finished | Phase::Failed) => self.final_progress,
      _ => 0.0,
    }
  }

  /// Ask the running batch to stop at its next poll. Returns whether one was running.
  pub fn force_finish(&self) -> bool {
    match &self.active {
      Some(control) => {
        info!(generation = self.generation, "force finish requested");
        control.force_finish();
        true
      }
      None => false,
    }
  }

  /// Load a manifest through `source` and scan it.
  pub fn scan_source(&mut self, source: &dyn ManifestSource, locator: &Path) -> Result<ScanSummary, SessionError> {
    let loaded = source.load_manifest(locator);
    match loaded {
      Ok(Some(manifest)) => self.scan(&manifest),
      Ok(None) => {
        self.final_progress = 0.0;
        self.set_phase(Phase::Failed);
        Err(SessionError::ManifestNotFound(locator.to_path_buf()))
      }
      Err(e) => {
        self.final_progress = 0.0;
        self.set_phase(Phase::Failed);
        Err(e.into())
      }
    }
  }

  /// Scan `manifest`, replacing everything a previous scan produced.
  pub fn scan(&mut self, manifest: &Manifest) -> Result<ScanSummary, SessionError> {
    if let Some(control) = self.active.take() {
      info!(generation = self.generation, "new scan supersedes active batch");
      control.cancel();
    }
    self.generation += 1;
    self.records.clear();
    self.buckets = Buckets::default();
    self.not_on_hub.clear();
    self.diagnostics.clear();
    self.final_progress = 0.0;
    self.report = None;
    self.set_phase(Phase::Scanning);

    if let Err(e) = self.index.refresh() {
      self.set_phase(Phase::Failed);
      return Err(e.into());
    }

    let specs = ManifestWalker::new(self.options.recursive).walk(manifest);
    let checker = LocalInstallChecker::new(self.index.as_ref(), self.options.always_check_for_updates);
    self.records = specs.into_iter().map(|spec| checker.check(spec)).collect();
    self.buckets = Buckets::partition(&self.records, &checker);

    for &idx in &self.buckets.version_error {
      let record = &self.records[idx];
      if let Some(reason) = &record.version_error {
        self.diagnostics.push(EngineError::VersionFormat {
          id: record.id().to_string(),
          reason: reason.clone(),
        });
      }
    }

    info!(
      records = self.records.len(),
      missing = self.buckets.missing.len(),
      update_needed = self.buckets.update_needed.len(),
      installed = self.buckets.installed.len(),
      version_errors = self.buckets.version_error.len(),
      "scan complete"
    );

    if self.buckets.needs_action() {
      self.set_phase(Phase::Pending);
    } else {
      self.report = Some(self.build_report(true, Vec::new()));
      self.final_progress = 1.0;
      self.set_phase(Phase::Finished);
    }

    Ok(self.summary())
  }

  /// Hand the actionable records of a pending scan to a new batch.
  pub fn start_download(&mut self) -> Result<DownloadBatch, SessionError> {
    if self.phase != Phase::Pending {
      return Err(SessionError::NothingPending(self.phase()));
    }

    let requests: Vec<DownloadRequest> = self
      .buckets
      .actionable()
      .map(|index| DownloadRequest {
        index,
        record: self.records[index].clone(),
      })
      .collect();

    let control = BatchControl::new();
    self.active = Some(control.clone());
    self.set_phase(Phase::Downloading);
    debug!(generation = self.generation, requests = requests.len(), "download batch issued");

    Ok(DownloadBatch {
      generation: self.generation,
      requests,
      control,
      events: self.events.clone(),
    })
  }

  /// Apply a finished batch and classify the session.
  pub fn finish(&mut self, outcome: BatchOutcome) -> Result<&FinalReport, SessionError> {
    if outcome.generation != self.generation {
      warn!(
        batch = outcome.generation,
        current = self.generation,
        "discarding outcome of superseded batch"
      );
      return Err(SessionError::StaleBatch {
        batch: outcome.generation,
        current: self.generation,
      });
    }
    if self.active.take().is_none() {
      return Err(SessionError::NoActiveBatch);
    }

    for item in outcome.items {
      let Some(record) = self.records.get_mut(item.index) else {
        continue;
      };
      record.matched_item = item.matched;
      record.download_state = item.state;
      record.download_error = item.error;
      if item.not_on_hub {
        self.not_on_hub.push(item.index);
      }
    }
    self.diagnostics.extend(outcome.diagnostics);
    self.final_progress = outcome.progress;

    // Downloads may have landed even for records whose batch step failed.
    if let Err(e) = self.index.refresh() {
      warn!(error = %e, "failed to refresh package index");
    }
    for record in &mut self.records {
      record.exists_locally = self.index.exists(record.id());
    }

    // A force finish that interrupts preparation is judged by the records alone.
    let interrupted = matches!(outcome.failure, Some(BatchError::Interrupted));
    let clean = !outcome.cancelled && (outcome.failure.is_none() || interrupted);
    let report = self.build_report(clean, outcome.user_prompts);
    self.set_phase(if report.success { Phase::Finished } else { Phase::Failed });

    info!(
      success = report.success,
      missing = report.missing.len(),
      not_on_hub = report.not_on_hub.len(),
      errors = report.errors.len(),
      "session finished"
    );
    Ok(self.report.insert(report))
  }

  fn set_phase(&mut self, phase: Phase) {
    if self.phase == phase {
      return;
    }
    debug!(from = %self.phase, to = %phase, "session phase");
    self.phase = phase;
    self.events.publish(SessionEvent::PhaseChanged {
      generation: self.generation,
      phase,
    });
  }

  fn ids(&self, bucket: Bucket) -> Vec<String> {
    self
      .buckets
      .slot(bucket)
      .iter()
      .map(|&idx| self.records[idx].id().to_string())
      .collect()
  }

  fn version_issues(&self) -> Vec<VersionIssue> {
    self
      .buckets
      .version_error
      .iter()
      .filter_map(|&idx| {
        let record = &self.records[idx];
        record.version_error.as_ref().map(|reason| VersionIssue {
          id: record.id().to_string(),
          reason: reason.clone(),
        })
      })
      .collect()
  }

  fn summary(&self) -> ScanSummary {
    ScanSummary {
      phase: self.phase,
      missing: self.ids(Bucket::Missing),
      update_needed: self.ids(Bucket::UpdateNeeded),
      installed: self.ids(Bucket::Installed),
      version_errors: self.version_issues(),
    }
  }

  fn build_report(&self, clean: bool, user_prompts: Vec<Prompt>) -> FinalReport {
    let valid = || self.records.iter().filter(|r| r.is_valid());
    let installed: Vec<String> = valid().filter(|r| r.exists_locally).map(|r| r.id().to_string()).collect();
    let missing: Vec<String> = valid().filter(|r| !r.exists_locally).map(|r| r.id().to_string()).collect();
    let version_errors = self.version_issues();

    FinalReport {
      success: clean && missing.is_empty() && version_errors.is_empty(),
      installed,
      missing,
      not_on_hub: self.not_on_hub.iter().map(|&idx| self.records[idx].id().to_string()).collect(),
      version_errors,
      errors: self.diagnostics.clone(),
      user_prompts,
    }
  }
}
