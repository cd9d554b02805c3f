mod config;
mod fetch;
mod scan;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use hubsync_lib::settings::Settings;

pub use config::cmd_config;
pub use fetch::cmd_fetch;
pub use scan::cmd_scan;

/// Options shared by every command that scans a manifest.
#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
  /// Directory installed packages live in
  #[arg(long, value_name = "DIR")]
  pub packages: Option<PathBuf>,

  /// Only look at the manifest's direct dependencies
  #[arg(long)]
  pub no_recursive: bool,

  /// Check `latest` dependencies for updates even when nothing is missing
  #[arg(long)]
  pub always_check: bool,
}

impl ScanArgs {
  /// Load the settings file and apply command-line overrides.
  pub fn settings(&self) -> Result<Settings> {
    let path = Settings::default_path();
    let mut settings = Settings::load(&path)
      .with_context(|| format!("Failed to load settings from {}", path.display()))?
      .unwrap_or_default();

    if let Some(packages) = &self.packages {
      settings.packages_dir = Some(packages.clone());
    }
    if self.no_recursive {
      settings.recursive = false;
    }
    if self.always_check {
      settings.always_check_for_updates = true;
    }
    Ok(settings)
  }
}

#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
  #[command(flatten)]
  pub scan: ScanArgs,

  /// Catalog index file
  #[arg(long, value_name = "FILE")]
  pub catalog: PathBuf,

  /// Directory the catalog's files are mirrored in
  #[arg(long, value_name = "DIR")]
  pub mirror: PathBuf,

  /// Enable the catalog if it is disabled
  #[arg(long)]
  pub auto_enable: bool,

  /// Accept every prompt left for the user without asking
  #[arg(short, long)]
  pub yes: bool,
}
