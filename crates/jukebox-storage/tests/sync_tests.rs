use std::sync::Arc;
use std::time::Duration;

use jukebox_core::domain::{SongId, Timestamp, resolve};
use jukebox_core::ports::{
  ExternalChange, InstanceId, LedgerKey, LedgerSnapshot, ManualClock, SyncBridge,
};
use jukebox_core::services::{LifecycleCoordinator, LifecycleSettings};
use jukebox_core::{CoreError, RejectReason};
use jukebox_storage::{MemoryBus, SqliteLedgerStore, StorageConfig};
use tempfile::TempDir;

fn clock() -> ManualClock {
  ManualClock::starting_at(Timestamp::from_millis(1_700_000_000_000))
}

fn sqlite(dir: &TempDir) -> Arc<SqliteLedgerStore> {
  let cfg = StorageConfig::at(dir.path().join("jukebox.db"));
  Arc::new(SqliteLedgerStore::open(&cfg, InstanceId::new()).unwrap())
}

#[test]
fn two_screens_on_one_bus_converge() {
  let bus = MemoryBus::default();
  let clock = clock();
  let (mut customer, _) =
    LifecycleCoordinator::restore(bus.attach(), clock.clone(), LifecycleSettings::default());
  let (mut dj, _) =
    LifecycleCoordinator::restore(bus.attach(), clock.clone(), LifecycleSettings::default());
  let mut customer_feed = customer.bridge().on_external_change();
  let mut dj_feed = dj.bridge().on_external_change();

  let id = customer.request_song("Mr. Brightside", "The Killers").unwrap();
  let change = dj_feed.try_recv().expect("dj sees the request");
  assert_eq!(dj.apply_external_change(change), vec![LedgerKey::Requests]);
  assert_eq!(dj.top_requests()[0].id, id);

  dj.play_song(&id).unwrap();
  let change = customer_feed.try_recv().expect("customer sees the play");
  assert_eq!(
    customer.apply_external_change(change),
    vec![LedgerKey::Requests, LedgerKey::Cooldowns]
  );

  assert!(customer.top_requests().is_empty());
  assert!(customer.is_on_cooldown(&id));
  let err = customer.request_song("mr.  brightside ", "the killers").unwrap_err();
  assert!(matches!(err, CoreError::Rejected { reason: RejectReason::Cooldown, .. }));
  assert!(customer_feed.try_recv().is_none());
}

#[test]
fn concurrent_writes_keep_the_last_one_in_the_store() {
  let bus = MemoryBus::default();
  let (mut a, _) =
    LifecycleCoordinator::restore(bus.attach(), clock(), LifecycleSettings::default());
  let (mut b, _) =
    LifecycleCoordinator::restore(bus.attach(), clock(), LifecycleSettings::default());

  a.request_song("Africa", "Toto").unwrap();
  b.request_song("Hey Jude", "The Beatles").unwrap();

  let (late, _) =
    LifecycleCoordinator::restore(bus.attach(), clock(), LifecycleSettings::default());
  let ids: Vec<SongId> = late.top_requests().into_iter().map(|r| r.id).collect();
  assert_eq!(ids, vec![resolve("Hey Jude", "The Beatles")]);
}

#[test]
fn blacklist_from_another_screen_purges_local_requests() {
  let bus = MemoryBus::default();
  let (mut customer, _) =
    LifecycleCoordinator::restore(bus.attach(), clock(), LifecycleSettings::default());
  let (mut dj, _) =
    LifecycleCoordinator::restore(bus.attach(), clock(), LifecycleSettings::default());
  let mut customer_feed = customer.bridge().on_external_change();

  customer.request_song("Baby Shark", "Pinkfong").unwrap();
  // The DJ never saw the request, so only the blacklist travels.
  let id = dj.blacklist_song("Baby Shark", "Pinkfong");

  let change = customer_feed.try_recv().unwrap();
  customer.apply_external_change(change);

  assert!(customer.is_blacklisted(&id));
  assert!(customer.request(&id).is_none());
  assert_eq!(bus.blob(LedgerKey::Requests).as_deref(), Some("[]"));
}

#[test]
fn late_request_snapshot_cannot_undo_a_play() {
  let bus = MemoryBus::default();
  let clock = clock();
  let (mut customer, _) =
    LifecycleCoordinator::restore(bus.attach(), clock.clone(), LifecycleSettings::default());
  let (mut dj, _) =
    LifecycleCoordinator::restore(bus.attach(), clock.clone(), LifecycleSettings::default());
  let mut dj_feed = dj.bridge().on_external_change();

  let id = customer.request_song("Africa", "Toto").unwrap();
  dj.apply_external_change(dj_feed.try_recv().unwrap());
  dj.play_song(&id).unwrap();

  // The customer asks again before the play reaches their screen.
  customer.request_song("Africa", "Toto").unwrap();
  dj.apply_external_change(dj_feed.try_recv().unwrap());

  assert!(dj.request(&id).is_none());
  assert!(dj.is_on_cooldown(&id));
  assert!(matches!(dj.play_song(&id), Err(CoreError::NotFound(_))));
  assert_eq!(bus.blob(LedgerKey::Requests).as_deref(), Some("[]"));
}

#[test]
fn sqlite_state_survives_a_restart() {
  let dir = TempDir::new().unwrap();
  let clock = clock();
  let id = {
    let (mut jukebox, report) =
      LifecycleCoordinator::restore(sqlite(&dir), clock.clone(), LifecycleSettings::default());
    assert!(report.loaded.is_empty());
    jukebox.request_song("Bohemian Rhapsody", "Queen").unwrap();
    jukebox.request_song("Wonderwall", "Oasis").unwrap();
    let id = resolve("Bohemian Rhapsody", "Queen");
    jukebox.play_song(&id).unwrap();
    jukebox.blacklist_song("Macarena", "Los del Rio");
    id
  };

  clock.advance(Duration::from_secs(60));
  let (jukebox, report) =
    LifecycleCoordinator::restore(sqlite(&dir), clock.clone(), LifecycleSettings::default());

  assert_eq!(report.loaded.len(), 3);
  assert!(report.recovered.is_empty());
  assert!(jukebox.is_on_cooldown(&id));
  assert_eq!(jukebox.top_requests().len(), 1);
  assert_eq!(jukebox.blacklist()[0].title, "Macarena");
}

#[test]
fn sqlite_stores_on_one_file_see_each_other() {
  let dir = TempDir::new().unwrap();
  let store_a = sqlite(&dir);
  let store_b = sqlite(&dir);
  let (mut a, _) =
    LifecycleCoordinator::restore(Arc::clone(&store_a), clock(), LifecycleSettings::default());
  let (mut b, _) =
    LifecycleCoordinator::restore(Arc::clone(&store_b), clock(), LifecycleSettings::default());
  let mut b_feed = b.bridge().on_external_change();
  let mut a_feed = a.bridge().on_external_change();

  let id = a.request_song("Dancing Queen", "ABBA").unwrap();
  a.request_song("Dancing Queen", "ABBA").unwrap();

  assert_eq!(store_a.poll_changes().unwrap(), 0);
  assert_eq!(store_b.poll_changes().unwrap(), 1);
  b.apply_external_change(b_feed.try_recv().unwrap());
  assert_eq!(b.request(&id).map(|r| r.request_count), Some(2));

  // Nothing new until somebody writes again.
  assert_eq!(store_b.poll_changes().unwrap(), 0);
  assert!(b_feed.try_recv().is_none());

  b.play_song(&id).unwrap();
  assert_eq!(store_a.poll_changes().unwrap(), 2);
  a.apply_external_change(a_feed.try_recv().unwrap());
  assert!(a.is_on_cooldown(&id));
  assert!(a.top_requests().is_empty());
}

#[test]
fn corrupt_sqlite_ledger_is_reset_on_restore() {
  let dir = TempDir::new().unwrap();
  {
    let store = sqlite(&dir);
    store.publish(&[LedgerSnapshot::new(LedgerKey::Cooldowns, "{not json")]).unwrap();
    store.publish(&[LedgerSnapshot::new(LedgerKey::Blacklist, "[]")]).unwrap();
  }

  let store = sqlite(&dir);
  let (jukebox, report) =
    LifecycleCoordinator::restore(Arc::clone(&store), clock(), LifecycleSettings::default());

  assert_eq!(report.recovered, vec![LedgerKey::Cooldowns]);
  assert_eq!(report.loaded, vec![LedgerKey::Blacklist]);
  assert!(jukebox.cooldowns().is_empty());
  assert_eq!(store.load(LedgerKey::Cooldowns).unwrap().as_deref(), Some("[]"));
}

#[tokio::test]
async fn watcher_forwards_foreign_writes() {
  let dir = TempDir::new().unwrap();
  let writer = sqlite(&dir);
  let reader = sqlite(&dir);
  let mut changes = reader.on_external_change();
  let watcher = reader.spawn_watcher(Duration::from_millis(20));

  writer.publish(&[LedgerSnapshot::new(LedgerKey::Blacklist, "[]")]).unwrap();

  let change = tokio::time::timeout(Duration::from_secs(5), changes.recv()).await.unwrap();
  let expected = vec![LedgerSnapshot::new(LedgerKey::Blacklist, "[]")];
  assert_eq!(change, Some(ExternalChange::Snapshots(expected)));
  watcher.abort();
}
