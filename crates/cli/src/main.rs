mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{FetchArgs, ScanArgs};

/// hubsync - resolve package manifests and fetch missing dependencies
#[derive(Parser)]
#[command(name = "hubsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (RUST_LOG takes precedence)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Scan a manifest and show which dependencies are missing
  Scan {
    /// Manifest file, or a directory containing meta.json
    manifest: PathBuf,

    #[command(flatten)]
    scan: ScanArgs,

    /// Print the scan summary as JSON
    #[arg(long)]
    json: bool,
  },

  /// Scan a manifest and download whatever is missing from a catalog
  Fetch {
    /// Manifest file, or a directory containing meta.json
    manifest: PathBuf,

    #[command(flatten)]
    fetch: FetchArgs,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show the settings file location and effective settings
  Config {
    #[arg(long)]
    json: bool,
  },
}

fn init_tracing(verbose: bool) {
  let fallback = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result = match cli.command {
    Commands::Scan { manifest, scan, json } => cmd::cmd_scan(&manifest, &scan, json),
    Commands::Fetch { manifest, fetch, json } => cmd::cmd_fetch(&manifest, &fetch, json),
    Commands::Config { json } => cmd::cmd_config(json),
  };

  match result {
    Ok(code) => code,
    Err(e) => {
      output::print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
