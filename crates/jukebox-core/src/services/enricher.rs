use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::domain::SongId;
use crate::ports::FactProvider;

/// Outcome of one enrichment lookup. `fact` is `None` when the provider
/// failed, timed out or had nothing to say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactNotice {
  pub song_id: SongId,
  pub title: String,
  pub artist: String,
  pub fact: Option<String>,
  ticket: u64,
}

pub type FactNotices = mpsc::UnboundedReceiver<FactNotice>;

struct Pending {
  ticket: u64,
  handle: Option<AbortHandle>,
}

/// Runs fun-fact lookups in the background, one per song identity.
///
/// Notices travel on a side channel and never touch the ledgers. A newer
/// lookup for the same song aborts the older one, and [`accept`](Self::accept)
/// drops anything that is no longer the latest.
pub struct Enricher {
  provider: Arc<dyn FactProvider>,
  timeout: Duration,
  tx: mpsc::UnboundedSender<FactNotice>,
  pending: HashMap<SongId, Pending>,
  next_ticket: u64,
}

impl Enricher {
  pub fn new(provider: Arc<dyn FactProvider>, timeout: Duration) -> (Self, FactNotices) {
    let (tx, rx) = mpsc::unbounded_channel();
    let enricher = Self { provider, timeout, tx, pending: HashMap::new(), next_ticket: 0 };
    (enricher, rx)
  }

  /// Starts a lookup for `id`, superseding any lookup still running for it.
  pub fn dispatch(&mut self, id: SongId, title: &str, artist: &str) {
    self.cancel(&id);
    self.next_ticket += 1;
    let ticket = self.next_ticket;

    let notice = FactNotice {
      song_id: id.clone(),
      title: title.to_string(),
      artist: artist.to_string(),
      fact: None,
      ticket,
    };

    let Ok(runtime) = Handle::try_current() else {
      warn!(song_id = %id, "no async runtime, skipping fun fact lookup");
      self.pending.insert(id, Pending { ticket, handle: None });
      let _ = self.tx.send(notice);
      return;
    };

    let provider = Arc::clone(&self.provider);
    let timeout = self.timeout;
    let tx = self.tx.clone();
    let task = runtime.spawn(async move {
      let lookup = provider.get_fact(&notice.title, &notice.artist);
      let fact = match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(fact)) if !fact.trim().is_empty() => Some(fact.trim().to_string()),
        Ok(Ok(_)) => None,
        Ok(Err(err)) => {
          debug!(
            song_id = %notice.song_id,
            provider = provider.name(),
            error = %err,
            "no fun fact available"
          );
          None
        }
        Err(_) => {
          debug!(
            song_id = %notice.song_id,
            provider = provider.name(),
            ?timeout,
            "fun fact lookup timed out"
          );
          None
        }
      };
      let _ = tx.send(FactNotice { fact, ..notice });
    });

    self.pending.insert(id, Pending { ticket, handle: Some(task.abort_handle()) });
  }

  /// Aborts the lookup running for `id`. Returns whether one was pending.
  pub fn cancel(&mut self, id: &SongId) -> bool {
    match self.pending.remove(id) {
      Some(pending) => {
        if let Some(handle) = pending.handle {
          handle.abort();
        }
        true
      }
      None => false,
    }
  }

  pub fn cancel_all(&mut self) {
    for (_, pending) in self.pending.drain() {
      if let Some(handle) = pending.handle {
        handle.abort();
      }
    }
  }

  /// Returns the notice if it answers the latest lookup for its song.
  pub fn accept(&mut self, notice: FactNotice) -> Option<FactNotice> {
    match self.pending.get(&notice.song_id) {
      Some(pending) if pending.ticket == notice.ticket => {
        self.pending.remove(&notice.song_id);
        Some(notice)
      }
      _ => {
        debug!(song_id = %notice.song_id, "discarding stale fun fact");
        None
      }
    }
  }

  pub fn pending_count(&self) -> usize {
    self.pending.len()
  }
}

impl Drop for Enricher {
  fn drop(&mut self) {
    self.cancel_all();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::resolve;
  use crate::ports::EnrichmentError;
  use async_trait::async_trait;

  struct Scripted {
    delay: Duration,
    answer: Result<&'static str, ()>,
  }

  #[async_trait]
  impl FactProvider for Scripted {
    fn name(&self) -> &str {
      "scripted"
    }

    async fn get_fact(&self, title: &str, _artist: &str) -> Result<String, EnrichmentError> {
      tokio::time::sleep(self.delay).await;
      match self.answer {
        Ok(text) => Ok(format!("{title}: {text}")),
        Err(()) => Err(EnrichmentError::Unavailable("down".into())),
      }
    }
  }

  fn enricher(delay: Duration, answer: Result<&'static str, ()>) -> (Enricher, FactNotices) {
    Enricher::new(Arc::new(Scripted { delay, answer }), Duration::from_secs(5))
  }

  #[tokio::test]
  async fn delivers_fact() {
    let (mut enricher, mut notices) = enricher(Duration::ZERO, Ok("fun"));
    enricher.dispatch(resolve("Song", "Band"), "Song", "Band");

    let notice = notices.recv().await.unwrap();
    let notice = enricher.accept(notice).unwrap();
    assert_eq!(notice.fact.as_deref(), Some("Song: fun"));
    assert_eq!(enricher.pending_count(), 0);
  }

  #[tokio::test]
  async fn failure_degrades_to_no_fact() {
    let (mut enricher, mut notices) = enricher(Duration::ZERO, Err(()));
    enricher.dispatch(resolve("Song", "Band"), "Song", "Band");

    let notice = enricher.accept(notices.recv().await.unwrap()).unwrap();
    assert_eq!(notice.fact, None);
  }

  #[tokio::test(start_paused = true)]
  async fn timeout_degrades_to_no_fact() {
    let (mut enricher, mut notices) = enricher(Duration::from_secs(60), Ok("late"));
    enricher.dispatch(resolve("Song", "Band"), "Song", "Band");

    let notice = enricher.accept(notices.recv().await.unwrap()).unwrap();
    assert_eq!(notice.fact, None);
  }

  #[tokio::test(start_paused = true)]
  async fn newer_lookup_supersedes_older() {
    let (mut enricher, mut notices) = enricher(Duration::from_millis(10), Ok("fun"));
    let id = resolve("Song", "Band");
    enricher.dispatch(id.clone(), "Song", "Band");
    enricher.dispatch(id.clone(), "song", "band");

    let notice = enricher.accept(notices.recv().await.unwrap()).unwrap();
    assert_eq!(notice.title, "song");
    assert!(notices.try_recv().is_err());
  }

  #[tokio::test]
  async fn cancelled_result_is_stale() {
    let (mut enricher, mut notices) = enricher(Duration::ZERO, Ok("fun"));
    let id = resolve("Song", "Band");
    enricher.dispatch(id.clone(), "Song", "Band");
    let notice = notices.recv().await.unwrap();

    enricher.cancel(&id);
    assert!(enricher.accept(notice).is_none());
  }

  #[test]
  fn without_runtime_reports_no_fact() {
    let (mut enricher, mut notices) = enricher(Duration::ZERO, Ok("fun"));
    enricher.dispatch(resolve("Song", "Band"), "Song", "Band");

    let notice = notices.try_recv().unwrap();
    assert_eq!(enricher.accept(notice).unwrap().fact, None);
  }
}
