//! The download batch state machine.
//!
//! A batch moves through `Idle -> Preparing -> BatchActive -> Draining -> Done`.
//! Preparing failures and cancellation skip straight to `Done`, which always
//! runs its teardown. Individual download failures never abort the batch.

use tracing::{debug, error, info, trace, warn};

use super::clock::Clock;
use super::progress::BatchProgress;
use super::prompts::{ConfirmationSurface, Prompt};
use super::sweeper::{ConfirmationSweeper, SweepPass};
use super::types::{
  BatchControl, BatchError, BatchOutcome, DownloadBatch, DownloadConfig, DownloadRequest, ItemResult,
  OrchestratorState, WaitStep,
};
use crate::catalog::{CatalogMatcher, CatalogService, DownloadHandle, DownloadStatus, MatchOutcome};
use crate::diagnostics::EngineError;
use crate::events::{EventBus, SessionEvent};
use crate::resolve::DownloadState;

/// Runs download batches against a catalog service.
pub struct DownloadOrchestrator<C: Clock> {
  clock: C,
  config: DownloadConfig,
  sweeper: ConfirmationSweeper,
}

/// A started download still being polled.
struct InFlight {
  /// Index into the batch results.
  item: usize,
  /// Index into the progress slots.
  slot: usize,
  handle: Box<dyn DownloadHandle>,
}

/// Mutable bookkeeping for one batch.
struct BatchRun {
  generation: u64,
  control: BatchControl,
  events: EventBus,
  items: Vec<ItemResult>,
  diagnostics: Vec<EngineError>,
  progress: BatchProgress,
  last_published: f32,
}

impl BatchRun {
  fn enter(&self, state: OrchestratorState) {
    debug!(generation = self.generation, ?state, "orchestrator state");
    self.control.set_state(state);
    self.events.publish(SessionEvent::StateChanged {
      generation: self.generation,
      state,
    });
  }

  fn publish_progress(&mut self) {
    let value = self.progress.overall();
    self.control.set_progress(value);
    if value != self.last_published {
      self.last_published = value;
      self.events.publish(SessionEvent::Progress {
        generation: self.generation,
        value,
      });
    }
  }

  fn item_failed(&mut self, item: usize, reason: String) {
    let result = &mut self.items[item];
    error!(id = %result.id, error = %reason, "download failed");
    result.state = DownloadState::Errored;
    result.error = Some(reason.clone());
    self.diagnostics.push(EngineError::Download {
      id: result.id.clone(),
      reason: reason.clone(),
    });
    self.events.publish(SessionEvent::ItemFailed {
      generation: self.generation,
      id: result.id.clone(),
      error: reason,
    });
  }

  /// Poll one download. Returns whether it is still pending.
  fn poll(&mut self, download: &mut InFlight) -> bool {
    match download.handle.poll() {
      DownloadStatus::NotStarted => true,
      DownloadStatus::Running(fraction) => {
        trace!(id = %self.items[download.item].id, fraction, "download progress");
        self.progress.record(download.slot, fraction);
        true
      }
      DownloadStatus::Complete => {
        let result = &mut self.items[download.item];
        info!(id = %result.id, "download complete");
        result.state = DownloadState::Complete;
        self.progress.complete(download.slot);
        self.events.publish(SessionEvent::ItemCompleted {
          generation: self.generation,
          id: result.id.clone(),
        });
        false
      }
      DownloadStatus::Failed(reason) => {
        self.item_failed(download.item, reason);
        false
      }
    }
  }

  fn record_sweep(&mut self, pass: &SweepPass) {
    for e in &pass.errors {
      self.diagnostics.push(EngineError::Prompt(e.to_string()));
    }
  }
}

impl<C: Clock> DownloadOrchestrator<C> {
  pub fn new(clock: C, config: DownloadConfig) -> Self {
    let sweeper = ConfirmationSweeper::new(config.auto_accept_prompts, &config.prompt_exclusions);
    Self { clock, config, sweeper }
  }

  pub fn config(&self) -> &DownloadConfig {
    &self.config
  }

  pub fn clock(&self) -> &C {
    &self.clock
  }

  /// Run `batch` to completion.
  ///
  /// 1. Prepare the catalog: open its surface, wait for stale entries to go
  ///    away and the listing to appear, enabling the service if allowed
  /// 2. Match every request against one catalog snapshot
  /// 3. Start and poll downloads for matched, downloadable records
  /// 4. Drain confirmation prompts raised by the backend
  /// 5. Restore the catalog to the state it was found in
  ///
  /// Phase-scoped failures are returned in [`BatchOutcome::failure`]; every
  /// other problem is a diagnostic on the outcome.
  pub async fn run(
    &self,
    batch: DownloadBatch,
    catalog: &mut dyn CatalogService,
    prompts: &mut dyn ConfirmationSurface,
  ) -> BatchOutcome {
    let DownloadBatch {
      generation,
      requests,
      control,
      events,
    } = batch;

    info!(generation, requests = requests.len(), "starting download batch");

    let mut run = BatchRun {
      generation,
      control,
      events,
      items: requests.iter().map(ItemResult::new).collect(),
      diagnostics: Vec::new(),
      progress: BatchProgress::new(0),
      last_published: 0.0,
    };

    run.enter(OrchestratorState::Preparing);
    let mut surface_opened = false;
    let mut enabled_by_us = false;
    let mut failure = None;
    let mut user_prompts = Vec::new();

    match self.prepare(catalog, &run.control, &mut surface_opened, &mut enabled_by_us).await {
      Err(e) => {
        if let Some(diagnostic) = e.to_diagnostic() {
          error!(generation, error = %e, "batch preparation failed");
          run.diagnostics.push(diagnostic);
        }
        failure = Some(e);
      }
      Ok(()) => {
        let pending = self.match_requests(&mut run, &requests, catalog);
        if pending.is_empty() {
          info!(generation, "nothing to download");
          run.progress = BatchProgress::new(0);
          run.publish_progress();
        } else {
          run.enter(OrchestratorState::BatchActive);
          self.download(&mut run, catalog, prompts, &pending).await;

          if !run.control.should_stop() {
            run.enter(OrchestratorState::Draining);
            user_prompts = self.drain(&mut run, prompts).await;
          }
        }
      }
    }

    // Done: teardown always runs.
    if surface_opened {
      catalog.restore_surface();
    }
    if enabled_by_us {
      if let Err(e) = catalog.disable() {
        warn!(error = %e, "failed to disable catalog after batch");
      } else {
        debug!("disabled catalog enabled for this batch");
      }
    }

    let cancelled = run.control.is_cancelled();
    let force_finished = run.control.is_force_finished();
    if cancelled {
      info!(generation, "batch cancelled");
      run.events.publish(SessionEvent::BatchCancelled { generation });
    } else if force_finished {
      info!(generation, "batch force-finished");
    }
    run.enter(OrchestratorState::Done);

    let progress = run.control.progress();
    info!(
      generation,
      progress,
      errors = run.diagnostics.len(),
      "download batch finished"
    );

    BatchOutcome {
      generation,
      items: run.items,
      diagnostics: run.diagnostics,
      failure,
      cancelled,
      force_finished,
      user_prompts,
      progress,
    }
  }

  async fn prepare(
    &self,
    catalog: &mut dyn CatalogService,
    control: &BatchControl,
    surface_opened: &mut bool,
    enabled_by_us: &mut bool,
  ) -> Result<(), BatchError> {
    catalog.open_surface()?;
    *surface_opened = true;

    self
      .wait_until(WaitStep::SurfaceOpen, control, || catalog.is_surface_open())
      .await?;
    self
      .wait_until(WaitStep::Teardown, control, || !catalog.has_stale_entries())
      .await?;
    self
      .wait_until(WaitStep::Listing, control, || catalog.listing_ready())
      .await?;

    if !catalog.is_enabled() {
      if !self.config.auto_enable_catalog {
        warn!("catalog service is disabled");
        return Err(BatchError::CatalogUnavailable);
      }
      info!("enabling catalog service");
      catalog.enable()?;
      *enabled_by_us = true;
      self
        .wait_until(WaitStep::Refresh, control, || !catalog.is_refreshing())
        .await?;
    }

    Ok(())
  }

  /// Poll `ready` until it holds, with a deadline relative to this step.
  async fn wait_until(
    &self,
    step: WaitStep,
    control: &BatchControl,
    mut ready: impl FnMut() -> bool,
  ) -> Result<(), BatchError> {
    let start = self.clock.now();
    loop {
      if control.should_stop() {
        return Err(BatchError::Interrupted);
      }
      if ready() {
        trace!(%step, "wait satisfied");
        return Ok(());
      }
      if self.clock.now().saturating_sub(start) >= self.config.wait_timeout {
        return Err(BatchError::Timeout {
          step,
          timeout: self.config.wait_timeout,
        });
      }
      self.clock.sleep(self.config.poll_interval).await;
    }
  }

  /// Match requests against one snapshot. Returns the downloadable item indexes.
  fn match_requests(
    &self,
    run: &mut BatchRun,
    requests: &[DownloadRequest],
    catalog: &dyn CatalogService,
  ) -> Vec<usize> {
    let snapshot = catalog.items();
    debug!(entries = snapshot.len(), "matching against catalog");
    let matcher = CatalogMatcher::new(&snapshot);
    let mut pending = Vec::new();

    for (idx, request) in requests.iter().enumerate() {
      match matcher.match_record(&request.record) {
        MatchOutcome::Matched(entry) => {
          let result = &mut run.items[idx];
          if !entry.can_be_downloaded {
            warn!(id = %result.id, entry = %entry.name, "package is on the Hub but not downloadable");
            result.not_on_hub = true;
            run.diagnostics.push(EngineError::NotOnHub { id: result.id.clone() });
          } else if !entry.needs_download {
            debug!(id = %result.id, entry = %entry.name, "catalog reports package is current");
          } else {
            pending.push(idx);
          }
          result.matched = Some(entry);
        }
        MatchOutcome::NoMatch => {}
        MatchOutcome::Error(e) => {
          warn!(error = %e, "catalog entry rejected");
          run.diagnostics.push(EngineError::Match(e));
        }
      }
    }

    pending
  }

  async fn download(
    &self,
    run: &mut BatchRun,
    catalog: &mut dyn CatalogService,
    prompts: &mut dyn ConfirmationSurface,
    pending: &[usize],
  ) {
    run.progress = BatchProgress::new(pending.len());
    let mut in_flight = Vec::with_capacity(pending.len());

    for (slot, &item) in pending.iter().enumerate() {
      let Some(entry) = run.items[item].matched.clone() else {
        continue;
      };
      match catalog.start_download(&entry) {
        Ok(handle) => {
          debug!(id = %run.items[item].id, entry = %entry.name, "download started");
          run.items[item].state = DownloadState::Started;
          in_flight.push(InFlight { item, slot, handle });
        }
        Err(e) => run.item_failed(item, e.to_string()),
      }
    }

    loop {
      if run.control.should_stop() {
        for download in in_flight.iter_mut() {
          debug!(id = %run.items[download.item].id, "detaching download");
          download.handle.detach();
        }
        return;
      }

      in_flight.retain_mut(|download| run.poll(download));
      run.publish_progress();

      let pass = self.sweeper.sweep(prompts);
      run.record_sweep(&pass);

      if in_flight.is_empty() {
        return;
      }
      self.clock.sleep(self.config.poll_interval).await;
    }
  }

  /// Accept prompts until a pass finds nothing to accept.
  async fn drain(&self, run: &mut BatchRun, prompts: &mut dyn ConfirmationSurface) -> Vec<Prompt> {
    loop {
      if run.control.should_stop() {
        return Vec::new();
      }
      self.clock.sleep(self.config.poll_interval).await;

      let pass = self.sweeper.sweep(prompts);
      run.record_sweep(&pass);
      if pass.accepted.is_empty() {
        if !pass.reserved.is_empty() {
          info!(count = pass.reserved.len(), "prompts left for the user");
        }
        return pass.reserved;
      }
    }
  }
}
