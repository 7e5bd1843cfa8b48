use jukebox_config::{ConfigBackend, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StorageConfig {
  /// SQLite file shared by every jukebox instance on this machine.
  pub db_path: PathBuf,
  pub journal_mode: Option<String>,
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
  /// How often the watcher looks for writes made by other instances.
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
  5_000
}

fn default_poll_interval_ms() -> u64 {
  500
}

impl StorageConfig {
  pub fn at(db_path: PathBuf) -> Self {
    StorageConfig {
      db_path,
      journal_mode: Some("WAL".to_string()),
      busy_timeout_ms: default_busy_timeout_ms(),
      poll_interval_ms: default_poll_interval_ms(),
    }
  }

  /// Reads `[storage]` from `backend`; without one the database lives in `data_dir`.
  pub fn load_from<B: ConfigBackend>(backend: &B, data_dir: &Path) -> Result<Self, ConfigError> {
    let stored: Option<StorageConfig> = backend.load_section_with_default("storage")?;
    Ok(stored.unwrap_or_else(|| StorageConfig::at(data_dir.join("jukebox.db"))))
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms.max(10))
  }
}
