use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::domain::{BlacklistRecord, CooldownRecord, RequestRecord, SongId, resolve};
use crate::errors::{CoreError, RejectReason};
use crate::ledger::{BlacklistLedger, CooldownLedger, RequestLedger, StoreCorrupt};
use crate::ports::{Clock, ExternalChange, LedgerKey, LedgerSnapshot, SyncBridge};
use crate::services::enricher::{Enricher, FactNotice};

/// How long a played song stays off the request list unless configured otherwise.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2 * 60 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSettings {
  /// How long a played song stays unrequestable.
  pub cooldown: Duration,
  /// Cadence at which the host should call [`LifecycleCoordinator::sweep`].
  pub sweep_interval: Duration,
}

impl Default for LifecycleSettings {
  fn default() -> Self {
    Self { cooldown: DEFAULT_COOLDOWN, sweep_interval: DEFAULT_SWEEP_INTERVAL }
  }
}

/// What happened while (re)loading ledgers from the bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
  /// Ledgers found in the store and decoded.
  pub loaded: Vec<LedgerKey>,
  /// Ledgers whose stored blob was corrupt and were reset to empty.
  pub recovered: Vec<LedgerKey>,
}

/// Owns the three ledgers and every transition between them.
///
/// All operations run to completion on the caller's thread; a play moves a
/// song from requests to cooldown inside one call, so no reader ever sees it
/// in both ledgers or in neither. Each mutation is mirrored through the
/// [`SyncBridge`] right after it is committed in memory.
pub struct LifecycleCoordinator<B, C>
where
  B: SyncBridge,
  C: Clock,
{
  bridge: B,
  clock: C,
  settings: LifecycleSettings,
  requests: RequestLedger,
  cooldowns: CooldownLedger,
  blacklist: BlacklistLedger,
  enricher: Option<Enricher>,
}

impl<B, C> LifecycleCoordinator<B, C>
where
  B: SyncBridge,
  C: Clock,
{
  /// Starts with empty ledgers, ignoring whatever the bridge holds.
  pub fn new(bridge: B, clock: C, settings: LifecycleSettings) -> Self {
    Self {
      bridge,
      clock,
      settings,
      requests: RequestLedger::new(),
      cooldowns: CooldownLedger::new(),
      blacklist: BlacklistLedger::new(),
      enricher: None,
    }
  }

  /// Builds the coordinator from the ledgers stored behind `bridge`.
  ///
  /// Corrupt blobs never abort startup: the affected ledger starts empty and
  /// the empty state is written back.
  pub fn restore(bridge: B, clock: C, settings: LifecycleSettings) -> (Self, RestoreReport) {
    let mut coordinator = Self::new(bridge, clock, settings);
    let report = coordinator.reload();
    (coordinator, report)
  }

  pub fn with_enricher(mut self, enricher: Enricher) -> Self {
    self.enricher = Some(enricher);
    self
  }

  pub fn settings(&self) -> &LifecycleSettings {
    &self.settings
  }

  pub fn bridge(&self) -> &B {
    &self.bridge
  }

  pub fn clock(&self) -> &C {
    &self.clock
  }

  // -------- customer --------

  /// Records a request for `(title, artist)`.
  ///
  /// Blacklisted songs are refused first, then songs on an active cooldown.
  /// Once the request is committed a fun-fact lookup is fired off; its
  /// outcome arrives later through the enricher's notices.
  pub fn request_song(&mut self, title: &str, artist: &str) -> Result<SongId, CoreError> {
    let id = resolve(title, artist);

    if self.blacklist.contains(&id) {
      info!(song_id = %id, "request rejected, song is blacklisted");
      return Err(CoreError::rejected(title, RejectReason::Blacklisted));
    }
    if self.cooldowns.is_active(&id, self.clock.now()) {
      info!(song_id = %id, "request rejected, song is on cooldown");
      return Err(CoreError::rejected(title, RejectReason::Cooldown));
    }

    let id = self.requests.submit(title, artist);
    let count = self.requests.get(&id).map(|r| r.request_count).unwrap_or(1);
    info!(song_id = %id, count, "song requested");
    self.publish(&[LedgerKey::Requests]);

    if let Some(enricher) = self.enricher.as_mut() {
      enricher.dispatch(id.clone(), title, artist);
    }

    Ok(id)
  }

  // -------- DJ --------

  /// Moves the request for `id` onto cooldown until `now + cooldown`.
  pub fn play_song(&mut self, id: &SongId) -> Result<CooldownRecord, CoreError> {
    let Some(request) = self.requests.remove(id) else {
      debug!(song_id = %id, "play ignored, no active request");
      return Err(CoreError::NotFound(id.clone()));
    };

    let now = self.clock.now();
    let cooldown = self.cooldowns.start(&request, now, self.settings.cooldown);
    info!(song_id = %id, expires_at = %cooldown.expires_at, "song played, cooldown started");
    self.publish(&[LedgerKey::Requests, LedgerKey::Cooldowns]);

    Ok(cooldown)
  }

  /// Blacklists `(title, artist)` and drops any pending request for it.
  ///
  /// An existing cooldown is left alone; it simply runs out as usual.
  pub fn blacklist_song(&mut self, title: &str, artist: &str) -> SongId {
    let (id, added) = self.blacklist.add(title, artist);
    let purged = self.requests.remove(&id).is_some();

    let mut changed = Vec::new();
    if added {
      changed.push(LedgerKey::Blacklist);
    }
    if purged {
      changed.push(LedgerKey::Requests);
    }
    if let Some(enricher) = self.enricher.as_mut() {
      enricher.cancel(&id);
    }

    info!(song_id = %id, added, purged, "song blacklisted");
    self.publish(&changed);
    id
  }

  /// Lifts the blacklist for `id`. Requests or cooldowns are not restored.
  pub fn unblacklist_song(&mut self, id: &SongId) -> Option<BlacklistRecord> {
    let removed = self.blacklist.remove(id);
    if removed.is_some() {
      info!(song_id = %id, "song removed from blacklist");
      self.publish(&[LedgerKey::Blacklist]);
    } else {
      debug!(song_id = %id, "unblacklist ignored, song not blacklisted");
    }
    removed
  }

  /// Drops every cooldown that expired by now. Safe at any cadence.
  pub fn sweep(&mut self) -> Vec<CooldownRecord> {
    let expired = self.cooldowns.sweep(self.clock.now());
    if !expired.is_empty() {
      debug!(count = expired.len(), "expired cooldowns swept");
      self.publish(&[LedgerKey::Cooldowns]);
    }
    expired
  }

  // -------- synchronization --------

  /// Replaces ledgers with the state another instance published.
  ///
  /// Returns the keys that were replaced. Requests that collide with the
  /// blacklist or an active cooldown after the replay are purged and the
  /// purge is published.
  pub fn apply_external_change(&mut self, change: ExternalChange) -> Vec<LedgerKey> {
    let snapshots = match change {
      ExternalChange::Snapshots(snapshots) => snapshots,
      ExternalChange::Resync => {
        let report = self.reload();
        return report.loaded.into_iter().chain(report.recovered).collect();
      }
    };

    let mut replaced = Vec::new();
    let mut recovered = Vec::new();
    for snapshot in snapshots {
      debug!(key = %snapshot.key, "applying external change");
      if let Err(err) = self.replace(snapshot.key, &snapshot.value) {
        warn!(key = %snapshot.key, error = %err, "discarding corrupt external snapshot");
        recovered.push(snapshot.key);
      }
      replaced.push(snapshot.key);
    }

    if self.purge_conflicting_requests() && !recovered.contains(&LedgerKey::Requests) {
      recovered.push(LedgerKey::Requests);
    }
    self.publish(&recovered);
    replaced
  }

  /// Reloads every ledger from the bridge.
  pub fn reload(&mut self) -> RestoreReport {
    let mut report = RestoreReport::default();

    for key in LedgerKey::ALL {
      match self.bridge.load(key) {
        Ok(Some(blob)) => match self.replace(key, &blob) {
          Ok(()) => report.loaded.push(key),
          Err(err) => {
            warn!(key = %key, error = %err, "stored ledger is corrupt, starting it empty");
            report.recovered.push(key);
          }
        },
        Ok(None) => self.clear(key),
        Err(err) => {
          error!(key = %key, error = %err, "could not load ledger, starting it empty");
          self.clear(key);
        }
      }
    }

    let mut heal = report.recovered.clone();
    if self.purge_conflicting_requests() && !heal.contains(&LedgerKey::Requests) {
      heal.push(LedgerKey::Requests);
    }
    self.publish(&heal);

    info!(
      requests = self.requests.len(),
      cooldowns = self.cooldowns.len(),
      blacklisted = self.blacklist.len(),
      "ledgers loaded"
    );
    report
  }

  // -------- enrichment --------

  /// Filters a notice from the enricher, `None` if it went stale.
  pub fn accept_fact(&mut self, notice: FactNotice) -> Option<FactNotice> {
    self.enricher.as_mut()?.accept(notice)
  }

  // -------- views --------

  pub fn top_requests(&self) -> Vec<RequestRecord> {
    self.requests.list_by_count()
  }

  pub fn cooldowns(&self) -> Vec<CooldownRecord> {
    self.cooldowns.list_by_expiry()
  }

  pub fn blacklist(&self) -> Vec<BlacklistRecord> {
    self.blacklist.list_sorted()
  }

  pub fn request(&self, id: &SongId) -> Option<&RequestRecord> {
    self.requests.get(id)
  }

  pub fn cooldown(&self, id: &SongId) -> Option<&CooldownRecord> {
    self.cooldowns.get(id)
  }

  pub fn is_blacklisted(&self, id: &SongId) -> bool {
    self.blacklist.contains(id)
  }

  pub fn is_on_cooldown(&self, id: &SongId) -> bool {
    self.cooldowns.is_active(id, self.clock.now())
  }

  // -------- internals --------

  fn replace(&mut self, key: LedgerKey, blob: &str) -> Result<(), StoreCorrupt> {
    let result = match key {
      LedgerKey::Requests => RequestLedger::from_snapshot(blob).map(|l| self.requests = l),
      LedgerKey::Cooldowns => CooldownLedger::from_snapshot(blob).map(|l| self.cooldowns = l),
      LedgerKey::Blacklist => BlacklistLedger::from_snapshot(blob).map(|l| self.blacklist = l),
    };
    if result.is_err() {
      self.clear(key);
    }
    result
  }

  fn clear(&mut self, key: LedgerKey) {
    match key {
      LedgerKey::Requests => self.requests = RequestLedger::new(),
      LedgerKey::Cooldowns => self.cooldowns = CooldownLedger::new(),
      LedgerKey::Blacklist => self.blacklist = BlacklistLedger::new(),
    }
  }

  /// Drops requests for songs that are blacklisted or still cooling down.
  /// A replayed snapshot may carry either, since the writer had not seen the
  /// blacklist entry or the play yet.
  fn purge_conflicting_requests(&mut self) -> bool {
    let now = self.clock.now();
    let stale: Vec<SongId> = self
      .requests
      .list_by_count()
      .into_iter()
      .map(|r| r.id)
      .filter(|id| self.blacklist.contains(id) || self.cooldowns.is_active(id, now))
      .collect();
    for id in &stale {
      debug!(song_id = %id, "dropping replayed request that conflicts with local state");
      self.requests.remove(id);
    }
    !stale.is_empty()
  }

  fn snapshot(&self, key: LedgerKey) -> LedgerSnapshot {
    let value = match key {
      LedgerKey::Requests => self.requests.to_snapshot(),
      LedgerKey::Cooldowns => self.cooldowns.to_snapshot(),
      LedgerKey::Blacklist => self.blacklist.to_snapshot(),
    };
    LedgerSnapshot::new(key, value)
  }

  fn publish(&self, keys: &[LedgerKey]) {
    if keys.is_empty() {
      return;
    }
    let snapshots: Vec<LedgerSnapshot> = keys.iter().map(|k| self.snapshot(*k)).collect();
    if let Err(err) = self.bridge.publish(&snapshots) {
      error!(error = %err, ?keys, "failed to publish ledger change");
    }
  }
}
