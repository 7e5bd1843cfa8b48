use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("could not determine a home directory for the jukebox")]
  NoHomeDirectory,

  #[error("{} is not valid TOML: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("{} is not editable TOML: {source}", path.display())]
  Edit {
    path: PathBuf,
    #[source]
    source: toml_edit::TomlError,
  },

  #[error("{} does not exist", .0.display())]
  MissingFile(PathBuf),

  #[error("section [{section}] is missing from {}", path.display())]
  MissingSection { section: String, path: PathBuf },

  #[error("section [{section}] has unexpected values: {source}")]
  Decode {
    section: String,
    #[source]
    source: toml::de::Error,
  },

  #[error("section [{section}] cannot be written: {source}")]
  Encode {
    section: String,
    #[source]
    source: toml_edit::ser::Error,
  },
}
