use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;
use uuid::Uuid;

/// The three independently stored ledger blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LedgerKey {
  Requests,
  Cooldowns,
  Blacklist,
}

impl LedgerKey {
  pub const ALL: [LedgerKey; 3] = [LedgerKey::Requests, LedgerKey::Cooldowns, LedgerKey::Blacklist];

  pub fn as_str(&self) -> &'static str {
    match self {
      LedgerKey::Requests => "songRequests",
      LedgerKey::Cooldowns => "cooldownSongs",
      LedgerKey::Blacklist => "blacklist",
    }
  }
}

impl fmt::Display for LedgerKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for LedgerKey {
  type Err = SyncError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    LedgerKey::ALL
      .into_iter()
      .find(|k| k.as_str() == s)
      .ok_or_else(|| SyncError::UnknownKey(s.to_string()))
  }
}

/// Full serialized content of one ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
  pub key: LedgerKey,
  pub value: String,
}

impl LedgerSnapshot {
  pub fn new(key: LedgerKey, value: impl Into<String>) -> Self {
    Self { key, value: value.into() }
  }
}

/// A mutation made by another instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalChange {
  /// Replace each named ledger wholesale.
  Snapshots(Vec<LedgerSnapshot>),
  /// Notifications were dropped; reload every ledger from the store.
  Resync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
  pub fn new() -> Self {
    InstanceId(Uuid::new_v4())
  }
}

impl Default for InstanceId {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for InstanceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

#[derive(Debug, Clone)]
pub struct Envelope {
  pub origin: InstanceId,
  pub change: ExternalChange,
}

/// Fan-out channel that bridges use to deliver changes to subscribers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
  tx: broadcast::Sender<Envelope>,
}

impl ChangeFeed {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  /// Delivers `change` to every subscriber except `origin` itself. Having no
  /// subscriber is fine.
  pub fn send(&self, origin: InstanceId, change: ExternalChange) {
    let _ = self.tx.send(Envelope { origin, change });
  }

  pub fn subscribe(&self, me: InstanceId) -> ExternalChanges {
    ExternalChanges { me, rx: self.tx.subscribe() }
  }
}

/// Stream of changes made by other instances.
#[derive(Debug)]
pub struct ExternalChanges {
  me: InstanceId,
  rx: broadcast::Receiver<Envelope>,
}

impl ExternalChanges {
  /// Next foreign change, or `None` once the bridge is gone.
  pub async fn recv(&mut self) -> Option<ExternalChange> {
    loop {
      match self.rx.recv().await {
        Ok(envelope) if envelope.origin == self.me => continue,
        Ok(envelope) => return Some(envelope.change),
        Err(RecvError::Lagged(skipped)) => {
          warn!(skipped, "change feed lagged, requesting resync");
          return Some(ExternalChange::Resync);
        }
        Err(RecvError::Closed) => return None,
      }
    }
  }

  /// Non-blocking variant of [`recv`](Self::recv).
  pub fn try_recv(&mut self) -> Option<ExternalChange> {
    loop {
      match self.rx.try_recv() {
        Ok(envelope) if envelope.origin == self.me => continue,
        Ok(envelope) => return Some(envelope.change),
        Err(TryRecvError::Lagged(skipped)) => {
          warn!(skipped, "change feed lagged, requesting resync");
          return Some(ExternalChange::Resync);
        }
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
      }
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
  #[error("storage error: {0}")]
  Storage(String),

  #[error("unknown ledger key: {0}")]
  UnknownKey(String),
}

/// Port that mirrors ledger state to durable storage and replays mutations
/// made by other instances.
///
/// Consistency is last-writer-wins per ledger snapshot: two instances that
/// write the same ledger at nearly the same time can lose one write. Views
/// converge, they are not linearizable.
pub trait SyncBridge: Send + Sync {
  fn instance_id(&self) -> InstanceId;

  /// Current stored blob for `key`, `None` if nothing was ever written.
  fn load(&self, key: LedgerKey) -> Result<Option<String>, SyncError>;

  /// Writes every snapshot. Stores that can should apply the batch atomically.
  fn publish(&self, snapshots: &[LedgerSnapshot]) -> Result<(), SyncError>;

  /// Subscribes to changes published by other instances.
  fn on_external_change(&self) -> ExternalChanges;
}

impl<T: SyncBridge + ?Sized> SyncBridge for Arc<T> {
  fn instance_id(&self) -> InstanceId {
    (**self).instance_id()
  }

  fn load(&self, key: LedgerKey) -> Result<Option<String>, SyncError> {
    (**self).load(key)
  }

  fn publish(&self, snapshots: &[LedgerSnapshot]) -> Result<(), SyncError> {
    (**self).publish(snapshots)
  }

  fn on_external_change(&self) -> ExternalChanges {
    (**self).on_external_change()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keys_round_trip_through_names() {
    for key in LedgerKey::ALL {
      assert_eq!(key.as_str().parse::<LedgerKey>().unwrap(), key);
    }
    assert!("queue".parse::<LedgerKey>().is_err());
  }

  #[test]
  fn feed_skips_own_changes() {
    let feed = ChangeFeed::new(8);
    let me = InstanceId::new();
    let other = InstanceId::new();
    let mut changes = feed.subscribe(me);

    feed.send(me, ExternalChange::Resync);
    let blacklist = vec![LedgerSnapshot::new(LedgerKey::Blacklist, "[]")];
    feed.send(other, ExternalChange::Snapshots(blacklist));

    assert_eq!(
      changes.try_recv(),
      Some(ExternalChange::Snapshots(vec![LedgerSnapshot::new(LedgerKey::Blacklist, "[]")]))
    );
    assert_eq!(changes.try_recv(), None);
  }

  #[test]
  fn lagging_subscriber_is_told_to_resync() {
    let feed = ChangeFeed::new(1);
    let mut changes = feed.subscribe(InstanceId::new());
    let other = InstanceId::new();
    feed.send(other, ExternalChange::Snapshots(vec![]));
    feed.send(other, ExternalChange::Snapshots(vec![]));

    assert_eq!(changes.try_recv(), Some(ExternalChange::Resync));
  }
}
