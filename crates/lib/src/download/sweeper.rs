//! Draining confirmation prompts around a download batch.

use serde::Serialize;
use tracing::{info, warn};

use super::prompts::{ConfirmationSurface, Prompt, PromptError};

/// Result of one pass over the active prompts.
#[derive(Debug, Default, Serialize)]
pub struct SweepPass {
  pub accepted: Vec<Prompt>,
  /// Prompts left for the user to answer.
  pub reserved: Vec<Prompt>,
  #[serde(skip)]
  pub errors: Vec<PromptError>,
}

/// Auto-accepts prompts, except those matching an exclusion marker.
#[derive(Debug, Clone)]
pub struct ConfirmationSweeper {
  auto_accept: bool,
  exclusions: Vec<String>,
}

impl ConfirmationSweeper {
  pub fn new(auto_accept: bool, exclusions: &[String]) -> Self {
    Self {
      auto_accept,
      exclusions: exclusions.iter().map(|e| e.to_lowercase()).collect(),
    }
  }

  /// Whether `prompt` must always be left for the user.
  pub fn is_excluded(&self, prompt: &Prompt) -> bool {
    let text = prompt.text.to_lowercase();
    self.exclusions.iter().any(|marker| text.contains(marker))
  }

  pub fn sweep(&self, surface: &mut dyn ConfirmationSurface) -> SweepPass {
    let mut pass = SweepPass::default();

    for prompt in surface.active_prompts() {
      if !self.auto_accept || self.is_excluded(&prompt) {
        pass.reserved.push(prompt);
        continue;
      }
      match surface.accept(prompt.id) {
        Ok(()) => {
          info!(id = prompt.id, text = %prompt.text, "auto-accepted prompt");
          pass.accepted.push(prompt);
        }
        // Answered elsewhere between listing and accepting.
        Err(PromptError::NotActive(_)) => {}
        Err(e) => {
          warn!(id = prompt.id, error = %e, "failed to accept prompt");
          pass.errors.push(e);
        }
      }
    }

    pass
  }
}
