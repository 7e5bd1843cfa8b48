use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Absolute point in time, in milliseconds since the Unix epoch.
///
/// This is the unit the persisted cooldown ledger uses, so it round-trips
/// through storage untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
  pub const fn from_millis(millis: i64) -> Self {
    Timestamp(millis)
  }

  pub fn as_millis(&self) -> i64 {
    self.0
  }

  pub fn now() -> Self {
    let millis = match SystemTime::now().duration_since(UNIX_EPOCH) {
      Ok(elapsed) => elapsed.as_millis() as i64,
      Err(before_epoch) => -(before_epoch.duration().as_millis() as i64),
    };
    Timestamp(millis)
  }

  pub fn saturating_add(self, duration: Duration) -> Self {
    let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
    Timestamp(self.0.saturating_add(millis))
  }

  /// Time left until `self`, zero if it already passed.
  pub fn duration_since(self, earlier: Timestamp) -> Duration {
    let diff = self.0.saturating_sub(earlier.0);
    if diff <= 0 { Duration::ZERO } else { Duration::from_millis(diff as u64) }
  }
}

impl fmt::Display for Timestamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}ms", self.0)
  }
}
