pub mod commands;
pub mod config;
pub mod render;
pub mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use jukebox_config::{JukeboxPaths, TomlConfigBackend};
use jukebox_core::ports::{InstanceId, SyncBridge, SystemClock};
use jukebox_core::services::{DjGate, Enricher, FactNotice, LifecycleCoordinator};
use jukebox_enrichment::OllamaFacts;
use jukebox_storage::{MemoryBus, SqliteLedgerStore};

use crate::config::AppConfig;
use crate::session::Session;

#[derive(Parser, Debug)]
#[command(name = "jukebox", about = "Song requests for the bar, with a DJ booth on the side")]
pub struct CliArgs {
  /// Keep config and data under this directory instead of the per-user ones.
  #[arg(long)]
  pub base_dir: Option<PathBuf>,

  /// Log filter, e.g. `debug` or `jukebox_storage=trace`. `RUST_LOG` wins when set.
  #[arg(long, default_value = "info")]
  pub log_level: String,

  /// Keep ledgers in memory only; nothing is written to disk.
  #[arg(long)]
  pub memory: bool,
}

fn init_tracing(level: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .compact()
    .init();
}

fn print(lines: &[String]) {
  for line in lines {
    println!("{line}");
  }
}

async fn next_fact(facts: &mut Option<mpsc::UnboundedReceiver<FactNotice>>) -> Option<FactNotice> {
  match facts.as_mut() {
    Some(rx) => rx.recv().await,
    None => std::future::pending().await,
  }
}

pub async fn run() -> Result<()> {
  let args = CliArgs::parse();
  init_tracing(&args.log_level);

  let paths = match &args.base_dir {
    Some(dir) => JukeboxPaths::portable(dir.clone()),
    None => JukeboxPaths::detect(),
  }
  .context("resolving config and data directories")?;
  let backend = TomlConfigBackend::new(paths.clone());
  let cfg = AppConfig::load(&backend, &paths).context("loading jukebox.toml")?;
  info!(config = %paths.config_file().display(), "configuration loaded");

  let mut watcher = None;
  let bridge: Arc<dyn SyncBridge> = if args.memory {
    info!("running with in-memory ledgers");
    Arc::new(MemoryBus::default().attach())
  } else {
    let store = SqliteLedgerStore::open(&cfg.storage, InstanceId::new())
      .with_context(|| format!("opening {}", cfg.storage.db_path.display()))?;
    let store = Arc::new(store);
    watcher = Some(store.spawn_watcher(cfg.storage.poll_interval()));
    store
  };

  // Subscribe first so nothing written during restore slips through.
  let mut changes = bridge.on_external_change();
  let settings = cfg.lifecycle.settings();
  let (mut jukebox, report) = LifecycleCoordinator::restore(bridge, SystemClock, settings.clone());
  if !report.recovered.is_empty() {
    warn!(recovered = ?report.recovered, "some ledgers were corrupt and start empty");
  }

  let mut facts = None;
  if cfg.enrichment.enabled {
    let provider = Arc::new(OllamaFacts::from_config(&cfg.enrichment));
    let (enricher, rx) = Enricher::new(provider, cfg.enrichment.timeout());
    jukebox = jukebox.with_enricher(enricher);
    facts = Some(rx);
  }

  let mut session = Session::new(jukebox, DjGate::new(cfg.dj.credentials()));
  println!("Welcome to the jukebox! Type `help` to see what you can do.");

  let mut stdin = BufReader::new(tokio::io::stdin()).lines();
  let mut sweep = tokio::time::interval(settings.sweep_interval);
  sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
  let mut changes_open = true;

  loop {
    tokio::select! {
      line = stdin.next_line() => {
        let Some(line) = line.context("reading stdin")? else { break };
        let reply = session.handle_line(&line);
        print(&reply.lines);
        if reply.exit {
          break;
        }
      }
      _ = sweep.tick() => session.on_tick(),
      change = changes.recv(), if changes_open => match change {
        Some(change) => session.on_external_change(change),
        None => {
          warn!("change feed closed, other screens will no longer be followed");
          changes_open = false;
        }
      },
      Some(notice) = next_fact(&mut facts) => {
        if let Some(line) = session.on_fact(notice) {
          println!("{line}");
        }
      }
    }
  }

  if let Some(watcher) = watcher {
    watcher.abort();
  }
  info!("jukebox closed");
  Ok(())
}
