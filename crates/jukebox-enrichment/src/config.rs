use jukebox_config::{ConfigBackend, ConfigError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EnrichmentConfig {
  /// Turns fun-fact lookups off entirely.
  pub enabled: bool,
  pub base_url: String,
  pub model: String,
  pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
  fn default() -> Self {
    EnrichmentConfig {
      enabled: true,
      base_url: "http://localhost:11434".to_string(),
      model: "llama3.1:8b".to_string(),
      timeout_secs: 10,
    }
  }
}

impl EnrichmentConfig {
  pub fn load_from<B: ConfigBackend>(backend: &B) -> Result<Self, ConfigError> {
    backend.load_section_with_default("enrichment")
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs.max(1))
  }
}
