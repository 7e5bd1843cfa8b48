use crate::io::atomic_write_str;
use crate::error::ConfigError;
use crate::paths::JukeboxPaths;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;

// toml_edit for writing, so hand-written comments survive a save.
use toml_edit::{DocumentMut, Item};

pub trait ConfigBackend {
  fn load_section<T: DeserializeOwned>(&self, section: &str) -> Result<T, ConfigError>;

  /// Like `load_section`, but a missing file or section yields `T::default()`.
  fn load_section_with_default<T>(&self, section: &str) -> Result<T, ConfigError>
  where
    T: DeserializeOwned + Default;

  fn save_section<T: Serialize>(&self, section: &str, value: &T) -> Result<(), ConfigError>;
}

pub struct TomlConfigBackend {
  paths: JukeboxPaths,
}

impl TomlConfigBackend {
  pub fn new(paths: JukeboxPaths) -> Self {
    Self { paths }
  }

  pub fn paths(&self) -> &JukeboxPaths {
    &self.paths
  }

  fn read_table(&self) -> Result<Option<toml::Table>, ConfigError> {
    let path = self.paths.config_file();
    let content = match fs::read_to_string(&path) {
      Ok(c) => c,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e.into()),
    };
    toml::from_str(&content).map(Some).map_err(|source| ConfigError::Parse { path, source })
  }
}

fn decode_section<T: DeserializeOwned>(
  section: &str,
  value: &toml::Value,
) -> Result<T, ConfigError> {
  value
    .clone()
    .try_into()
    .map_err(|source| ConfigError::Decode { section: section.to_string(), source })
}

impl ConfigBackend for TomlConfigBackend {
  fn load_section<T: DeserializeOwned>(&self, section: &str) -> Result<T, ConfigError> {
    let path = self.paths.config_file();
    let Some(table) = self.read_table()? else {
      return Err(ConfigError::MissingFile(path));
    };

    let value = table
      .get(section)
      .ok_or_else(|| ConfigError::MissingSection { section: section.to_string(), path })?;

    decode_section(section, value)
  }

  fn load_section_with_default<T>(&self, section: &str) -> Result<T, ConfigError>
  where
    T: DeserializeOwned + Default,
  {
    let Some(table) = self.read_table()? else {
      return Ok(T::default());
    };

    match table.get(section) {
      Some(value) => decode_section(section, value),
      None => Ok(T::default()),
    }
  }

  fn save_section<T: Serialize>(&self, section: &str, value: &T) -> Result<(), ConfigError> {
    let path = self.paths.config_file();

    // 1) Current config as an editable document, or a blank one.
    let mut doc: DocumentMut = match fs::read_to_string(&path) {
      Ok(content) => content
        .parse::<DocumentMut>()
        .map_err(|source| ConfigError::Edit { path: path.clone(), source })?,
      Err(e) if e.kind() == ErrorKind::NotFound => DocumentMut::new(),
      Err(e) => return Err(e.into()),
    };

    // 2) Serialize the section on its own.
    let section_doc = toml_edit::ser::to_document(value)
      .map_err(|source| ConfigError::Encode { section: section.to_string(), source })?;

    // 3) Swap it in, leaving the rest of the document untouched.
    doc[section] = Item::Table(section_doc.as_table().clone());

    // 4) Temp file + rename.
    atomic_write_str(&path, &doc.to_string())?;

    Ok(())
  }
}
