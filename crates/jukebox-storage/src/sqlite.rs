use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use jukebox_core::ports::{
  ChangeFeed, ExternalChange, ExternalChanges, InstanceId, LedgerKey, LedgerSnapshot, SyncBridge,
  SyncError,
};

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::models::{LedgerBlobRow, NewLedgerBlobRow};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;
type SqlitePooled = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Debug)]
struct ConnectionOptions {
  journal_mode: Option<String>,
  busy_timeout_ms: u64,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
    let mut pragmas = format!("PRAGMA busy_timeout = {};", self.busy_timeout_ms);
    if let Some(mode) = &self.journal_mode {
      pragmas.push_str(&format!(" PRAGMA journal_mode = {mode};"));
    }
    conn.batch_execute(&pragmas).map_err(diesel::r2d2::Error::QueryError)
  }
}

/// Ledger blobs in a SQLite file that several jukebox processes share.
///
/// Each row carries a revision and the id of the instance that wrote it.
/// [`poll_changes`](Self::poll_changes) compares revisions with the last ones
/// this store saw and forwards foreign writes to subscribers.
pub struct SqliteLedgerStore {
  pool: SqlitePool,
  origin: InstanceId,
  feed: ChangeFeed,
  seen: Mutex<HashMap<LedgerKey, i64>>,
}

impl SqliteLedgerStore {
  pub fn open(config: &StorageConfig, origin: InstanceId) -> Result<Self, StorageError> {
    if let Some(parent) = config.db_path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
      }
    }

    if let Some(mode) = &config.journal_mode {
      if !mode.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(StorageError::Pool(format!("invalid journal mode: {mode}")));
      }
    }

    let manager = ConnectionManager::<SqliteConnection>::new(config.db_path.to_string_lossy());
    let pool = Pool::builder()
      .max_size(4)
      .connection_customizer(Box::new(ConnectionOptions {
        journal_mode: config.journal_mode.clone(),
        busy_timeout_ms: config.busy_timeout_ms,
      }))
      .build(manager)
      .map_err(|e| StorageError::Pool(e.to_string()))?;

    let store = SqliteLedgerStore {
      pool,
      origin,
      feed: ChangeFeed::new(64),
      seen: Mutex::new(HashMap::new()),
    };

    {
      let mut pooled = store.conn()?;
      let conn: &mut SqliteConnection = &mut pooled;
      conn.run_pending_migrations(MIGRATIONS).map_err(|e| StorageError::Migration(e.to_string()))?;
    }

    // Whatever is already stored is picked up by load(), not by the watcher.
    let rows = store.rows()?;
    {
      let mut seen = store.seen();
      for row in rows {
        if let Ok(key) = LedgerKey::from_str(&row.key) {
          seen.insert(key, row.revision);
        }
      }
    }

    info!(path = %config.db_path.display(), origin = %origin, "ledger store opened");
    Ok(store)
  }

  /// Current revision of `key`, `None` if it was never written.
  pub fn revision(&self, key: LedgerKey) -> Result<Option<i64>, StorageError> {
    use crate::schema::ledger_blobs::dsl;

    let mut conn = self.conn()?;
    let rev = dsl::ledger_blobs
      .find(key.as_str())
      .select(dsl::revision)
      .first::<i64>(&mut *conn)
      .optional()?;
    Ok(rev)
  }

  /// Forwards rows written by other instances since the last poll. Returns
  /// how many ledgers changed.
  pub fn poll_changes(&self) -> Result<usize, StorageError> {
    let rows = self.rows()?;
    let mut by_origin: BTreeMap<String, Vec<LedgerSnapshot>> = BTreeMap::new();

    {
      let mut seen = self.seen();
      for row in rows {
        let key = match LedgerKey::from_str(&row.key) {
          Ok(key) => key,
          Err(e) => {
            warn!(error = %e, "skipping unknown row in ledger_blobs");
            continue;
          }
        };
        let last = seen.get(&key).copied().unwrap_or(0);
        if row.revision <= last {
          continue;
        }
        seen.insert(key, row.revision);
        if row.origin != self.origin.to_string() {
          by_origin.entry(row.origin).or_default().push(LedgerSnapshot::new(key, row.value));
        }
      }
    }

    let mut changed = 0;
    for (writer, snapshots) in by_origin {
      changed += snapshots.len();
      debug!(writer = %writer, count = snapshots.len(), "foreign ledger write detected");
      // Foreign origins never equal ours, so a fresh id is enough to get past
      // the self filter of every local subscriber.
      self.feed.send(InstanceId::new(), ExternalChange::Snapshots(snapshots));
    }
    Ok(changed)
  }

  /// Polls for foreign writes every `period` until the store is dropped.
  pub fn spawn_watcher(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
    let store: Weak<Self> = Arc::downgrade(self);
    tokio::spawn(async move {
      let mut tick = tokio::time::interval(period);
      tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
      loop {
        tick.tick().await;
        let Some(strong) = store.upgrade() else { break };
        match tokio::task::spawn_blocking(move || strong.poll_changes()).await {
          Ok(Ok(_)) => {}
          Ok(Err(e)) => warn!(error = %e, "polling ledger store failed"),
          Err(e) => {
            warn!(error = %e, "ledger watcher task failed");
            break;
          }
        }
      }
      debug!("ledger watcher stopped");
    })
  }

  fn conn(&self) -> Result<SqlitePooled, StorageError> {
    self.pool.get().map_err(|e| StorageError::Pool(e.to_string()))
  }

  fn seen(&self) -> MutexGuard<'_, HashMap<LedgerKey, i64>> {
    self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn rows(&self) -> Result<Vec<LedgerBlobRow>, StorageError> {
    use crate::schema::ledger_blobs::dsl;

    let mut conn = self.conn()?;
    let rows = dsl::ledger_blobs.select(LedgerBlobRow::as_select()).load(&mut *conn)?;
    Ok(rows)
  }

  fn write(&self, snapshots: &[LedgerSnapshot]) -> Result<Vec<(LedgerKey, i64)>, StorageError> {
    use crate::schema::ledger_blobs::dsl;

    let origin = self.origin.to_string();
    let mut conn = self.conn()?;
    let written = conn.transaction::<_, diesel::result::Error, _>(|conn| {
      let mut written = Vec::with_capacity(snapshots.len());
      for snapshot in snapshots {
        let row = NewLedgerBlobRow {
          key: snapshot.key.as_str(),
          value: &snapshot.value,
          revision: 1,
          origin: &origin,
        };
        let rev = diesel::insert_into(dsl::ledger_blobs)
          .values(&row)
          .on_conflict(dsl::key)
          .do_update()
          .set((
            dsl::value.eq(&snapshot.value),
            dsl::revision.eq(dsl::revision + 1_i64),
            dsl::origin.eq(&origin),
          ))
          .returning(dsl::revision)
          .get_result::<i64>(conn)?;
        written.push((snapshot.key, rev));
      }
      Ok(written)
    })?;
    Ok(written)
  }
}

impl SyncBridge for SqliteLedgerStore {
  fn instance_id(&self) -> InstanceId {
    self.origin
  }

  fn load(&self, key: LedgerKey) -> Result<Option<String>, SyncError> {
    use crate::schema::ledger_blobs::dsl;

    let mut conn = self.conn()?;
    let blob = dsl::ledger_blobs
      .find(key.as_str())
      .select(dsl::value)
      .first::<String>(&mut *conn)
      .optional()
      .map_err(StorageError::from)?;
    Ok(blob)
  }

  fn publish(&self, snapshots: &[LedgerSnapshot]) -> Result<(), SyncError> {
    if snapshots.is_empty() {
      return Ok(());
    }
    let written = self.write(snapshots)?;
    let mut seen = self.seen();
    for (key, rev) in written {
      let last = seen.entry(key).or_insert(rev);
      *last = (*last).max(rev);
    }
    debug!(origin = %self.origin, count = snapshots.len(), "ledgers written");
    Ok(())
  }

  fn on_external_change(&self) -> ExternalChanges {
    self.feed.subscribe(self.origin)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn open(dir: &TempDir) -> SqliteLedgerStore {
    let cfg = StorageConfig::at(dir.path().join("jukebox.db"));
    SqliteLedgerStore::open(&cfg, InstanceId::new()).unwrap()
  }

  #[test]
  fn empty_store_loads_nothing() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    for key in LedgerKey::ALL {
      assert_eq!(store.load(key).unwrap(), None);
      assert_eq!(store.revision(key).unwrap(), None);
    }
  }

  #[test]
  fn publish_bumps_revision_per_ledger() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    store.publish(&[LedgerSnapshot::new(LedgerKey::Requests, "[]")]).unwrap();
    store
      .publish(&[
        LedgerSnapshot::new(LedgerKey::Requests, "[1]"),
        LedgerSnapshot::new(LedgerKey::Cooldowns, "[]"),
      ])
      .unwrap();

    assert_eq!(store.revision(LedgerKey::Requests).unwrap(), Some(2));
    assert_eq!(store.revision(LedgerKey::Cooldowns).unwrap(), Some(1));
    assert_eq!(store.load(LedgerKey::Requests).unwrap().as_deref(), Some("[1]"));
  }

  #[test]
  fn own_writes_are_not_reported() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let mut changes = store.on_external_change();

    store.publish(&[LedgerSnapshot::new(LedgerKey::Blacklist, "[]")]).unwrap();

    assert_eq!(store.poll_changes().unwrap(), 0);
    assert!(changes.try_recv().is_none());
  }

  #[test]
  fn rejects_odd_journal_mode() {
    let dir = TempDir::new().unwrap();
    let mut cfg = StorageConfig::at(dir.path().join("jukebox.db"));
    cfg.journal_mode = Some("WAL; DROP TABLE x".into());
    assert!(SqliteLedgerStore::open(&cfg, InstanceId::new()).is_err());
  }
}
