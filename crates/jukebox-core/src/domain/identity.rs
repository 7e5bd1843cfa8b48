use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical key of a song, derived from its free-text title and artist.
///
/// Every ledger lookup goes through this key, so two spellings that resolve
/// to the same identity are the same song as far as requests, cooldowns and
/// the blacklist are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(String);

impl SongId {
  /// Wraps an already resolved identity, e.g. one typed back by a DJ.
  pub fn from_raw(raw: impl Into<String>) -> Self {
    SongId(raw.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for SongId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<SongId> for String {
  fn from(id: SongId) -> Self {
    id.0
  }
}

/// Resolves `(title, artist)` into `"{artist}-{title}"`.
///
/// Each field is trimmed, lower-cased and has its whitespace runs replaced
/// by a single hyphen. Distinct display strings may collapse onto the same
/// identity; that is intended.
pub fn resolve(title: &str, artist: &str) -> SongId {
  SongId(format!("{}-{}", normalize(artist), normalize(title)))
}

fn normalize(field: &str) -> String {
  field.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}
