use crate::domain::{RequestRecord, SongId, resolve};
use crate::ledger::{StoreCorrupt, decode, encode};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLedger {
  records: Vec<RequestRecord>,
}

impl RequestLedger {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_snapshot(snapshot: &str) -> Result<Self, StoreCorrupt> {
    Ok(Self { records: decode("songRequests", snapshot)? })
  }

  pub fn to_snapshot(&self) -> String {
    encode(&self.records)
  }

  /// Increments the request for `(title, artist)` or opens a new one with a
  /// count of 1. The first spelling submitted is the one kept for display.
  pub fn submit(&mut self, title: &str, artist: &str) -> SongId {
    let id = resolve(title, artist);
    match self.records.iter_mut().find(|r| r.id == id) {
      Some(existing) => existing.request_count = existing.request_count.saturating_add(1),
      None => self.records.push(RequestRecord {
        id: id.clone(),
        title: title.to_string(),
        artist: artist.to_string(),
        request_count: 1,
      }),
    }
    id
  }

  pub fn remove(&mut self, id: &SongId) -> Option<RequestRecord> {
    let index = self.records.iter().position(|r| &r.id == id)?;
    Some(self.records.remove(index))
  }

  pub fn get(&self, id: &SongId) -> Option<&RequestRecord> {
    self.records.iter().find(|r| &r.id == id)
  }

  /// Top requests first; ties keep the order in which songs were first requested.
  pub fn list_by_count(&self) -> Vec<RequestRecord> {
    let mut sorted = self.records.clone();
    sorted.sort_by(|a, b| b.request_count.cmp(&a.request_count));
    sorted
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}
