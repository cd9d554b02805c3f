//! Aggregate batch progress.

/// Per-request progress contributions.
///
/// Each slot only ever grows, so a download that errors or reports a lower
/// fraction keeps its last contribution and overall progress never regresses.
#[derive(Debug, Clone)]
pub struct BatchProgress {
  slots: Vec<f32>,
}

impl BatchProgress {
  pub fn new(total: usize) -> Self {
    Self { slots: vec![0.0; total] }
  }

  pub fn total(&self) -> usize {
    self.slots.len()
  }

  /// Raise the contribution of `slot` to `value` if it is higher.
  pub fn record(&mut self, slot: usize, value: f32) {
    let Some(current) = self.slots.get_mut(slot) else {
      return;
    };
    let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    if value > *current {
      *current = value;
    }
  }

  pub fn complete(&mut self, slot: usize) {
    self.record(slot, 1.0);
  }

  /// Sum of contributions over the batch size. An empty batch is done.
  pub fn overall(&self) -> f32 {
    if self.slots.is_empty() {
      return 1.0;
    }
    let sum: f32 = self.slots.iter().sum();
    (sum / self.slots.len() as f32).min(1.0)
  }
}
