use crate::domain::{BlacklistRecord, SongId, resolve};
use crate::ledger::{StoreCorrupt, decode, encode};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlacklistLedger {
  records: Vec<BlacklistRecord>,
}

impl BlacklistLedger {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_snapshot(snapshot: &str) -> Result<Self, StoreCorrupt> {
    Ok(Self { records: decode("blacklist", snapshot)? })
  }

  pub fn to_snapshot(&self) -> String {
    encode(&self.records)
  }

  /// Returns the identity and whether the ledger changed. Re-adding is a no-op.
  pub fn add(&mut self, title: &str, artist: &str) -> (SongId, bool) {
    let id = resolve(title, artist);
    if self.contains(&id) {
      return (id, false);
    }
    self.records.push(BlacklistRecord {
      id: id.clone(),
      title: title.to_string(),
      artist: artist.to_string(),
    });
    (id, true)
  }

  pub fn remove(&mut self, id: &SongId) -> Option<BlacklistRecord> {
    let index = self.records.iter().position(|r| &r.id == id)?;
    Some(self.records.remove(index))
  }

  pub fn contains(&self, id: &SongId) -> bool {
    self.records.iter().any(|r| &r.id == id)
  }

  /// Ascending by title, compared ordinally (case-sensitive, so `"Zebra"`
  /// sorts before `"apple"`). Equal titles keep insertion order.
  pub fn list_sorted(&self) -> Vec<BlacklistRecord> {
    let mut sorted = self.records.clone();
    sorted.sort_by(|a, b| a.title.cmp(&b.title));
    sorted
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}
