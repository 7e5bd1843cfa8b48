use std::time::Duration;

use crate::domain::{CooldownRecord, RequestRecord, SongId, Timestamp};
use crate::ledger::{StoreCorrupt, decode, encode};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooldownLedger {
  records: Vec<CooldownRecord>,
}

impl CooldownLedger {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_snapshot(snapshot: &str) -> Result<Self, StoreCorrupt> {
    Ok(Self { records: decode("cooldownSongs", snapshot)? })
  }

  pub fn to_snapshot(&self) -> String {
    encode(&self.records)
  }

  /// Puts a played request on cooldown until `now + duration`.
  ///
  /// A record already present for the same identity is replaced.
  pub fn start(
    &mut self,
    record: &RequestRecord,
    now: Timestamp,
    duration: Duration,
  ) -> CooldownRecord {
    let cooldown = CooldownRecord {
      id: record.id.clone(),
      title: record.title.clone(),
      artist: record.artist.clone(),
      request_count: record.request_count,
      expires_at: now.saturating_add(duration),
    };
    self.records.retain(|r| r.id != cooldown.id);
    self.records.push(cooldown.clone());
    cooldown
  }

  /// Drops every record with `expires_at <= now` and returns them.
  pub fn sweep(&mut self, now: Timestamp) -> Vec<CooldownRecord> {
    let (expired, kept): (Vec<_>, Vec<_>) =
      std::mem::take(&mut self.records).into_iter().partition(|r| r.is_expired(now));
    self.records = kept;
    expired
  }

  pub fn is_active(&self, id: &SongId, now: Timestamp) -> bool {
    self.records.iter().any(|r| &r.id == id && !r.is_expired(now))
  }

  pub fn get(&self, id: &SongId) -> Option<&CooldownRecord> {
    self.records.iter().find(|r| &r.id == id)
  }

  /// Latest expiry first, the song closest to coming back last.
  pub fn list_by_expiry(&self) -> Vec<CooldownRecord> {
    let mut sorted = self.records.clone();
    sorted.sort_by(|a, b| b.expires_at.cmp(&a.expires_at));
    sorted
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}
