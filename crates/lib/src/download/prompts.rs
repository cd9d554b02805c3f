//! Confirmation prompts raised by the download backend.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub type PromptId = u64;

/// An active prompt waiting for an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
  pub id: PromptId,
  pub text: String,
}

#[derive(Debug, Error)]
pub enum PromptError {
  #[error("prompt {0} is no longer active")]
  NotActive(PromptId),

  #[error("accepting prompt {id} failed: {message}")]
  Action { id: PromptId, message: String },
}

/// Prompts the backend surfaces to the user.
pub trait ConfirmationSurface {
  fn active_prompts(&self) -> Vec<Prompt>;

  fn accept(&mut self, id: PromptId) -> Result<(), PromptError>;
}

/// Runs when a prompt is accepted.
pub type AcceptAction = Box<dyn FnOnce() -> Result<(), String> + Send>;

struct Entry {
  prompt: Prompt,
  on_accept: Option<AcceptAction>,
}

#[derive(Default)]
struct Board {
  next_id: PromptId,
  entries: Vec<Entry>,
}

/// Shared prompt registry.
///
/// Cloning yields another handle to the same board, so a catalog backend can
/// raise prompts that the sweeper later drains.
#[derive(Clone, Default)]
pub struct PromptBoard {
  inner: Arc<Mutex<Board>>,
}

impl fmt::Debug for PromptBoard {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PromptBoard")
      .field("active", &self.lock().entries.len())
      .finish()
  }
}

impl PromptBoard {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Board> {
    self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Raise a prompt. `on_accept` runs once if the prompt is accepted.
  pub fn raise(&self, text: impl Into<String>, on_accept: Option<AcceptAction>) -> PromptId {
    let mut board = self.lock();
    board.next_id += 1;
    let id = board.next_id;
    let prompt = Prompt { id, text: text.into() };
    debug!(id, text = %prompt.text, "prompt raised");
    board.entries.push(Entry { prompt, on_accept });
    id
  }

  /// Remove a prompt without running its accept action.
  pub fn dismiss(&self, id: PromptId) -> bool {
    let mut board = self.lock();
    let before = board.entries.len();
    board.entries.retain(|e| e.prompt.id != id);
    board.entries.len() != before
  }

  pub fn is_empty(&self) -> bool {
    self.lock().entries.is_empty()
  }
}

impl ConfirmationSurface for PromptBoard {
  fn active_prompts(&self) -> Vec<Prompt> {
    self.lock().entries.iter().map(|e| e.prompt.clone()).collect()
  }

  fn accept(&mut self, id: PromptId) -> Result<(), PromptError> {
    // Take the entry out before running the action so the lock is not held.
    let entry = {
      let mut board = self.lock();
      let pos = board
        .entries
        .iter()
        .position(|e| e.prompt.id == id)
        .ok_or(PromptError::NotActive(id))?;
      board.entries.remove(pos)
    };

    debug!(id, text = %entry.prompt.text, "prompt accepted");
    match entry.on_accept {
      Some(action) => action().map_err(|message| PromptError::Action { id, message }),
      None => Ok(()),
    }
  }
}
