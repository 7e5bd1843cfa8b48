use jukebox_core::ports::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
  #[error("connection pool error: {0}")]
  Pool(String),
  #[error("query error: {0}")]
  Query(#[from] diesel::result::Error),
  #[error("migration error: {0}")]
  Migration(String),
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl From<StorageError> for SyncError {
  fn from(err: StorageError) -> Self {
    SyncError::Storage(err.to_string())
  }
}
