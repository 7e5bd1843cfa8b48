use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use crate::domain::Timestamp;

/// Source of "now" for every time-based rule (cooldown expiry, sweeps).
pub trait Clock: Send + Sync {
  fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Timestamp {
    Timestamp::now()
  }
}

/// Hand-driven clock. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
  millis: Arc<AtomicI64>,
}

impl ManualClock {
  pub fn starting_at(at: Timestamp) -> Self {
    Self { millis: Arc::new(AtomicI64::new(at.as_millis())) }
  }

  pub fn set(&self, at: Timestamp) {
    self.millis.store(at.as_millis(), Ordering::SeqCst);
  }

  pub fn advance(&self, by: Duration) {
    let next = self.now().saturating_add(by);
    self.set(next);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Timestamp {
    Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
  }
}
