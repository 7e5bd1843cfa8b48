use jukebox_config::{ConfigBackend, ConfigError, JukeboxPaths};
use jukebox_core::services::{DjCredentials, LifecycleSettings};
use jukebox_enrichment::EnrichmentConfig;
use jukebox_storage::StorageConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LifecycleConfig {
  /// How long a played song stays unrequestable.
  pub cooldown_secs: u64,
  pub sweep_interval_secs: u64,
}

impl Default for LifecycleConfig {
  fn default() -> Self {
    let defaults = LifecycleSettings::default();
    LifecycleConfig {
      cooldown_secs: defaults.cooldown.as_secs(),
      sweep_interval_secs: defaults.sweep_interval.as_secs(),
    }
  }
}

impl LifecycleConfig {
  pub fn load_from<B: ConfigBackend>(backend: &B) -> Result<Self, ConfigError> {
    backend.load_section_with_default("lifecycle")
  }

  pub fn settings(&self) -> LifecycleSettings {
    LifecycleSettings {
      cooldown: Duration::from_secs(self.cooldown_secs),
      sweep_interval: Duration::from_secs(self.sweep_interval_secs.max(1)),
    }
  }
}

/// The shared DJ login. Not a security boundary, just a gate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DjConfig {
  pub username: String,
  pub password: String,
}

impl Default for DjConfig {
  fn default() -> Self {
    DjConfig { username: "Cowboy".to_string(), password: "Thecowboyisthebest".to_string() }
  }
}

impl DjConfig {
  pub fn load_from<B: ConfigBackend>(backend: &B) -> Result<Self, ConfigError> {
    backend.load_section_with_default("dj")
  }

  pub fn credentials(&self) -> DjCredentials {
    DjCredentials { username: self.username.clone(), password: self.password.clone() }
  }
}

/// Every section the console reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
  pub lifecycle: LifecycleConfig,
  pub dj: DjConfig,
  pub enrichment: EnrichmentConfig,
  pub storage: StorageConfig,
}

impl AppConfig {
  /// Loads all sections and writes them back, so a fresh install ends up
  /// with a complete `jukebox.toml` to edit.
  pub fn load<B: ConfigBackend>(backend: &B, paths: &JukeboxPaths) -> Result<Self, ConfigError> {
    let cfg = AppConfig {
      lifecycle: LifecycleConfig::load_from(backend)?,
      dj: DjConfig::load_from(backend)?,
      enrichment: EnrichmentConfig::load_from(backend)?,
      storage: StorageConfig::load_from(backend, &paths.data_dir)?,
    };
    backend.save_section("lifecycle", &cfg.lifecycle)?;
    backend.save_section("dj", &cfg.dj)?;
    backend.save_section("enrichment", &cfg.enrichment)?;
    backend.save_section("storage", &cfg.storage)?;
    Ok(cfg)
  }
}
