//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output including colored status
//! messages, bucket listings and the batch progress line.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use hubsync_lib::session::{FinalReport, ScanSummary, VersionIssue};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const MISSING: &str = "-";
  pub const UPDATE: &str = "~";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

/// Progress as a whole percentage, `0..=100`.
pub fn format_percent(value: f32) -> String {
  format!("{:>3.0}%", (value.clamp(0.0, 1.0) * 100.0).floor())
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// Rewrite the progress line on stderr.
pub fn print_progress(value: f32) {
  let mut stderr = io::stderr();
  let _ = write!(
    stderr,
    "\r{} downloading {}",
    symbols::ARROW.if_supports_color(Stream::Stderr, |s| s.cyan()),
    format_percent(value)
  );
  let _ = stderr.flush();
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

fn print_ids(title: &str, symbol: &str, ids: &[String]) {
  if ids.is_empty() {
    return;
  }
  println!();
  println!("{} ({}):", title, ids.len());
  for id in ids {
    println!("  {} {}", symbol, id);
  }
}

fn print_version_issues(issues: &[VersionIssue]) {
  if issues.is_empty() {
    return;
  }
  println!();
  println!("Version errors ({}):", issues.len());
  for issue in issues {
    println!(
      "  {} {} {}",
      symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()),
      issue.id,
      format!("({})", issue.reason).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }
}

pub fn print_summary(summary: &ScanSummary) {
  print_info(&format!("Found {} dependencies ({})", summary.total(), summary.phase));
  print_ids("Missing", symbols::MISSING, &summary.missing);
  print_ids("Update check", symbols::UPDATE, &summary.update_needed);
  print_ids("Installed", symbols::SUCCESS, &summary.installed);
  print_version_issues(&summary.version_errors);
  println!();
}

pub fn print_report(report: &FinalReport) {
  print_ids("Still missing", symbols::MISSING, &report.missing);
  print_ids("On the Hub but not downloadable", symbols::WARNING, &report.not_on_hub);
  print_version_issues(&report.version_errors);

  if !report.errors.is_empty() {
    println!();
    println!("Errors:");
    for error in report.errors.entries() {
      println!("  {} {}", symbols::ERROR, error);
    }
  }

  println!();
  if report.success {
    print_success(&format!("All {} dependencies installed", report.installed.len()));
  } else {
    print_error(&format!(
      "{} installed, {} missing, {} with version errors",
      report.installed.len(),
      report.missing.len(),
      report.version_errors.len()
    ));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_format_duration() {
    assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
    assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
  }

  #[test]
  fn test_format_percent() {
    assert_eq!(format_percent(0.0), "  0%");
    assert_eq!(format_percent(0.456), " 45%");
    assert_eq!(format_percent(1.0), "100%");
    assert_eq!(format_percent(3.0), "100%");
  }
}
