use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{SongId, Timestamp};

/// An active customer request. `request_count` starts at 1 and grows with
/// every repeat request while the record is alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
  pub id: SongId,
  pub title: String,
  pub artist: String,
  pub request_count: u32,
}

/// A played song waiting out its cooldown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownRecord {
  pub id: SongId,
  pub title: String,
  pub artist: String,
  /// How many requests the song had when it was played.
  #[serde(default = "one")]
  pub request_count: u32,
  #[serde(rename = "cooldownUntil")]
  pub expires_at: Timestamp,
}

fn one() -> u32 {
  1
}

impl CooldownRecord {
  pub fn is_expired(&self, now: Timestamp) -> bool {
    self.expires_at <= now
  }

  pub fn remaining(&self, now: Timestamp) -> Duration {
    self.expires_at.duration_since(now)
  }
}

/// A song the DJ refuses to take requests for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistRecord {
  pub id: SongId,
  pub title: String,
  pub artist: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn request_uses_persisted_field_names() {
    let record = RequestRecord {
      id: SongId::from_raw("eagles-hotel-california"),
      title: "Hotel California".into(),
      artist: "Eagles".into(),
      request_count: 3,
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["id"], "eagles-hotel-california");
    assert_eq!(json["requestCount"], 3);
  }

  #[test]
  fn cooldown_reads_legacy_blob_without_count() {
    let json = r#"{"id":"a-b","title":"B","artist":"A","cooldownUntil":5000}"#;
    let record: CooldownRecord = serde_json::from_str(json).unwrap();
    assert_eq!(record.request_count, 1);
    assert_eq!(record.expires_at, Timestamp::from_millis(5000));
  }

  #[test]
  fn cooldown_remaining_saturates() {
    let record = CooldownRecord {
      id: SongId::from_raw("a-b"),
      title: "B".into(),
      artist: "A".into(),
      request_count: 1,
      expires_at: Timestamp::from_millis(10_000),
    };
    assert_eq!(record.remaining(Timestamp::from_millis(4_000)), Duration::from_secs(6));
    assert_eq!(record.remaining(Timestamp::from_millis(12_000)), Duration::ZERO);
    assert!(record.is_expired(Timestamp::from_millis(10_000)));
    assert!(!record.is_expired(Timestamp::from_millis(9_999)));
  }
}
