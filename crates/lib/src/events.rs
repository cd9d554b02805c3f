//! Session event bus.
//!
//! Observers subscribe to a session's bus and receive every event published
//! after they subscribed. Dropping the receiver unsubscribes.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::download::OrchestratorState;
use crate::session::Phase;

const EVENT_CAPACITY: usize = 256;

/// Something observable happened. Batch events carry the batch generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
  PhaseChanged { generation: u64, phase: Phase },
  StateChanged { generation: u64, state: OrchestratorState },
  Progress { generation: u64, value: f32 },
  ItemCompleted { generation: u64, id: String },
  ItemFailed { generation: u64, id: String, error: String },
  BatchCancelled { generation: u64 },
}

pub type Subscription = broadcast::Receiver<SessionEvent>;

#[derive(Debug, Clone)]
pub struct EventBus {
  tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
  pub fn new() -> Self {
    let (tx, _) = broadcast::channel(EVENT_CAPACITY);
    Self { tx }
  }

  pub fn subscribe(&self) -> Subscription {
    self.tx.subscribe()
  }

  pub fn subscriber_count(&self) -> usize {
    self.tx.receiver_count()
  }

  /// Publish to current subscribers. Publishing with no subscribers is a no-op.
  pub fn publish(&self, event: SessionEvent) {
    trace!(?event, "publishing event");
    let _ = self.tx.send(event);
  }
}

impl Default for EventBus {
  fn default() -> Self {
    Self::new()
  }
}
