//! Implementation of the `hubsync fetch` command.
//!
//! Scans a manifest, downloads whatever the scan found missing from a mirrored
//! catalog, asks about prompts that were left for the user and prints the
//! final report.

use std::io::{self, IsTerminal};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use hubsync_lib::catalog::FsCatalog;
use hubsync_lib::download::{
  BatchOutcome, ConfirmationSurface, DownloadOrchestrator, OrchestratorState, PromptBoard, TokioClock,
};
use hubsync_lib::events::{SessionEvent, Subscription};
use hubsync_lib::manifest::FsManifestSource;
use hubsync_lib::resolve::FsPackageIndex;
use hubsync_lib::session::{FinalReport, Phase, ResolutionSession};

use super::FetchArgs;
use crate::output::{
  format_duration, print_info, print_json, print_progress, print_report, print_summary, print_warning,
};
use crate::prompts::confirm;

pub fn cmd_fetch(manifest: &Path, args: &FetchArgs, json: bool) -> Result<ExitCode> {
  let mut settings = args.scan.settings()?;
  if args.auto_enable {
    settings.auto_enable_catalog = true;
  }
  let packages = settings.packages_dir();

  let index = FsPackageIndex::open(&packages)
    .with_context(|| format!("Failed to index packages in {}", packages.display()))?;
  let mut session = ResolutionSession::new(Box::new(index), settings.session_options());

  let summary = session
    .scan_source(&FsManifestSource, manifest)
    .with_context(|| format!("Failed to scan {}", manifest.display()))?;
  if !json {
    print_summary(&summary);
  }

  if summary.phase != Phase::Pending {
    let report = session
      .report()
      .cloned()
      .context("Scan finished without a report")?;
    return finish(&report, json);
  }

  let board = PromptBoard::new();
  let mut catalog = FsCatalog::new(&args.catalog, &args.mirror, &packages, board.clone());
  let orchestrator = DownloadOrchestrator::new(TokioClock::new(), settings.download_config());

  let batch = session.start_download()?;
  let generation = batch.generation;
  let events = session.subscribe();
  let show_progress = !json && io::stderr().is_terminal();

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let mut surface = board.clone();
  let outcome = rt.block_on(async {
    let (outcome, ()) = tokio::join!(
      orchestrator.run(batch, &mut catalog, &mut surface),
      follow_progress(events, generation, show_progress),
    );
    outcome
  });
  debug!(generation, "batch finished");
  if !json {
    print_info(&format!("Batch finished in {}", format_duration(started.elapsed())));
  }

  answer_prompts(&outcome, &board, args.yes);

  let report = session.finish(outcome)?.clone();
  finish(&report, json)
}

/// Render batch progress until the batch reaches `Done`.
async fn follow_progress(mut events: Subscription, generation: u64, visible: bool) {
  loop {
    match events.recv().await {
      Ok(SessionEvent::Progress { generation: g, value }) if g == generation => {
        if visible {
          print_progress(value);
        }
      }
      Ok(SessionEvent::StateChanged {
        generation: g,
        state: OrchestratorState::Done,
      }) if g == generation => break,
      Ok(_) | Err(RecvError::Lagged(_)) => {}
      Err(RecvError::Closed) => break,
    }
  }
  if visible {
    eprintln!();
  }
}

/// Ask about every prompt the batch left for the user.
fn answer_prompts(outcome: &BatchOutcome, board: &PromptBoard, assume_yes: bool) {
  let mut surface = board.clone();
  for prompt in &outcome.user_prompts {
    match confirm(&prompt.text, assume_yes) {
      Ok(true) => {
        if let Err(e) = surface.accept(prompt.id) {
          print_warning(&e.to_string());
        }
      }
      Ok(false) => {
        board.dismiss(prompt.id);
      }
      Err(e) => {
        print_warning(&format!("Left unanswered: {} ({})", prompt.text, e));
        board.dismiss(prompt.id);
      }
    }
  }
}

fn finish(report: &FinalReport, json: bool) -> Result<ExitCode> {
  if json {
    print_json(report)?;
  } else {
    print_report(report);
  }
  Ok(if report.success {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  })
}
