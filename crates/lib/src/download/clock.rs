//! Time source for the download orchestrator.

use std::future::{Future, ready};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Elapsed-time source with an awaitable sleep.
pub trait Clock {
  /// Time elapsed since the clock was created.
  fn now(&self) -> Duration;

  fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Wall-clock time through the tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
  origin: Instant,
}

impl TokioClock {
  pub fn new() -> Self {
    Self { origin: Instant::now() }
  }
}

impl Default for TokioClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for TokioClock {
  fn now(&self) -> Duration {
    self.origin.elapsed()
  }

  fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
    tokio::time::sleep(duration)
  }
}

/// Virtual time for tests: sleeping advances the clock instantly.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
  nanos: Arc<AtomicU64>,
}

impl VirtualClock {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn advance(&self, duration: Duration) {
    self.nanos.fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
  }
}

impl Clock for VirtualClock {
  fn now(&self) -> Duration {
    Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
  }

  fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
    self.advance(duration);
    ready(())
  }
}
