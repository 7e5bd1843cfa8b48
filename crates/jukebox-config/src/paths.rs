use directories::ProjectDirs;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Environment variable that switches to the portable layout.
pub const BASE_DIR_ENV: &str = "JUKEBOX_BASE_DIR";

const CONFIG_FILE: &str = "jukebox.toml";

/// Where the jukebox keeps its files. Every directory exists once a value
/// has been built.
#[derive(Debug, Clone)]
pub struct JukeboxPaths {
  pub base_dir: PathBuf,
  pub config_dir: PathBuf,
  pub data_dir: PathBuf,
  pub cache_dir: PathBuf,
}

impl JukeboxPaths {
  /// `JUKEBOX_BASE_DIR` when set, the per-user platform directories otherwise.
  pub fn detect() -> Result<Self, ConfigError> {
    if let Some(base) = std::env::var_os(BASE_DIR_ENV).filter(|v| !v.is_empty()) {
      return Self::portable(PathBuf::from(base));
    }

    let dirs = ProjectDirs::from("com", "jukebox", "jukebox").ok_or(ConfigError::NoHomeDirectory)?;
    let paths = JukeboxPaths {
      base_dir: dirs.config_dir().to_path_buf(),
      config_dir: dirs.config_dir().to_path_buf(),
      data_dir: dirs.data_dir().to_path_buf(),
      cache_dir: dirs.cache_dir().to_path_buf(),
    };
    paths.ensure()
  }

  /// Everything under `base`: `config/`, `data/` and `cache/`.
  pub fn portable(base: PathBuf) -> Result<Self, ConfigError> {
    let paths = JukeboxPaths {
      config_dir: base.join("config"),
      data_dir: base.join("data"),
      cache_dir: base.join("cache"),
      base_dir: base,
    };
    paths.ensure()
  }

  pub fn config_file(&self) -> PathBuf {
    self.config_dir.join(CONFIG_FILE)
  }

  pub fn is_portable(&self) -> bool {
    self.config_dir.parent() == Some(self.base_dir.as_path())
  }

  fn ensure(self) -> Result<Self, ConfigError> {
    for dir in [&self.config_dir, &self.data_dir, &self.cache_dir] {
      std::fs::create_dir_all(dir)?;
    }
    Ok(self)
  }
}
