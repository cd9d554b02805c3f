//! Implementation of the `hubsync scan` command.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use hubsync_lib::manifest::FsManifestSource;
use hubsync_lib::resolve::FsPackageIndex;
use hubsync_lib::session::ResolutionSession;

use super::ScanArgs;
use crate::output::{print_json, print_summary};

/// Scan `manifest` against the local packages directory and print the buckets.
pub fn cmd_scan(manifest: &Path, args: &ScanArgs, json: bool) -> Result<ExitCode> {
  let settings = args.settings()?;
  let packages = settings.packages_dir();

  let index = FsPackageIndex::open(&packages)
    .with_context(|| format!("Failed to index packages in {}", packages.display()))?;
  let mut session = ResolutionSession::new(Box::new(index), settings.session_options());

  let summary = session
    .scan_source(&FsManifestSource, manifest)
    .with_context(|| format!("Failed to scan {}", manifest.display()))?;

  if json {
    print_json(&summary)?;
  } else {
    print_summary(&summary);
  }

  Ok(ExitCode::SUCCESS)
}
