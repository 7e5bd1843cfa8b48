use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jukebox_core::ports::{
  ChangeFeed, ExternalChange, ExternalChanges, InstanceId, LedgerKey, LedgerSnapshot, SyncBridge,
  SyncError,
};
use tracing::debug;

struct Shared {
  blobs: Mutex<HashMap<LedgerKey, String>>,
  feed: ChangeFeed,
}

/// Process-local store shared by several jukebox instances, e.g. a customer
/// screen and a DJ screen running side by side.
///
/// Nothing survives the process; use [`SqliteLedgerStore`](crate::SqliteLedgerStore)
/// for durability.
#[derive(Clone)]
pub struct MemoryBus {
  shared: Arc<Shared>,
}

impl MemoryBus {
  pub fn new(capacity: usize) -> Self {
    Self {
      shared: Arc::new(Shared {
        blobs: Mutex::new(HashMap::new()),
        feed: ChangeFeed::new(capacity),
      }),
    }
  }

  /// A new instance's handle onto the bus.
  pub fn attach(&self) -> MemoryBridge {
    MemoryBridge { id: InstanceId::new(), bus: self.clone() }
  }

  /// Current blob for `key`, as the next instance to attach would load it.
  pub fn blob(&self, key: LedgerKey) -> Option<String> {
    self.blobs().get(&key).cloned()
  }

  /// Overwrites a blob without notifying anyone; models state left over
  /// from an earlier session.
  pub fn seed(&self, key: LedgerKey, blob: impl Into<String>) {
    self.blobs().insert(key, blob.into());
  }

  fn blobs(&self) -> std::sync::MutexGuard<'_, HashMap<LedgerKey, String>> {
    self.shared.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl Default for MemoryBus {
  fn default() -> Self {
    Self::new(256)
  }
}

pub struct MemoryBridge {
  id: InstanceId,
  bus: MemoryBus,
}

impl SyncBridge for MemoryBridge {
  fn instance_id(&self) -> InstanceId {
    self.id
  }

  fn load(&self, key: LedgerKey) -> Result<Option<String>, SyncError> {
    Ok(self.bus.blob(key))
  }

  fn publish(&self, snapshots: &[LedgerSnapshot]) -> Result<(), SyncError> {
    {
      let mut blobs = self.bus.blobs();
      for snapshot in snapshots {
        blobs.insert(snapshot.key, snapshot.value.clone());
      }
    }
    debug!(origin = %self.id, count = snapshots.len(), "published to memory bus");
    self.bus.shared.feed.send(self.id, ExternalChange::Snapshots(snapshots.to_vec()));
    Ok(())
  }

  fn on_external_change(&self) -> ExternalChanges {
    self.bus.shared.feed.subscribe(self.id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn publish_reaches_other_instances_only() {
    let bus = MemoryBus::default();
    let a = bus.attach();
    let b = bus.attach();
    let mut a_changes = a.on_external_change();
    let mut b_changes = b.on_external_change();

    a.publish(&[LedgerSnapshot::new(LedgerKey::Requests, "[]")]).unwrap();

    assert!(a_changes.try_recv().is_none());
    assert_eq!(
      b_changes.try_recv(),
      Some(ExternalChange::Snapshots(vec![LedgerSnapshot::new(LedgerKey::Requests, "[]")]))
    );
    assert_eq!(b.load(LedgerKey::Requests).unwrap().as_deref(), Some("[]"));
  }

  #[test]
  fn seed_is_visible_but_silent() {
    let bus = MemoryBus::default();
    let a = bus.attach();
    let mut changes = a.on_external_change();

    bus.seed(LedgerKey::Blacklist, "[]");

    assert_eq!(a.load(LedgerKey::Blacklist).unwrap().as_deref(), Some("[]"));
    assert!(changes.try_recv().is_none());
  }
}
