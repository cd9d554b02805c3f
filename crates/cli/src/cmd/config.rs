use std::process::ExitCode;

use anyhow::{Context, Result};

use hubsync_lib::settings::Settings;

use crate::output::{print_info, print_json, print_stat};

pub fn cmd_config(json: bool) -> Result<ExitCode> {
  let path = Settings::default_path();
  let loaded = Settings::load(&path).with_context(|| format!("Failed to load settings from {}", path.display()))?;
  let exists = loaded.is_some();
  let settings = loaded.unwrap_or_default();

  if json {
    let packages_dir = settings.packages_dir();
    print_json(&serde_json::json!({
      "path": path,
      "exists": exists,
      "packagesDir": packages_dir,
      "settings": settings,
    }))?;
    return Ok(ExitCode::SUCCESS);
  }

  if exists {
    print_info(&format!("Settings file: {}", path.display()));
  } else {
    print_info(&format!("Settings file: {} (not found, using defaults)", path.display()));
  }
  println!();
  print_stat("Packages", &settings.packages_dir().display().to_string());
  print_stat("Recursive", &settings.recursive.to_string());
  print_stat("Always check for updates", &settings.always_check_for_updates.to_string());
  print_stat("Auto-enable catalog", &settings.auto_enable_catalog.to_string());
  print_stat("Auto-accept prompts", &settings.auto_accept_prompts.to_string());
  print_stat("Prompt exclusions", &settings.prompt_exclusions.join(", "));
  print_stat("Wait timeout", &format!("{}ms", settings.wait_timeout_ms));
  print_stat("Poll interval", &format!("{}ms", settings.poll_interval_ms));

  Ok(ExitCode::SUCCESS)
}
