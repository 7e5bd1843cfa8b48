use async_trait::async_trait;

/// Why no fact came back. Purely advisory: callers degrade to "no fact".
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
  #[error("provider unavailable: {0}")]
  Unavailable(String),

  #[error("provider timed out")]
  Timeout,

  #[error("invalid response: {0}")]
  InvalidResponse(String),
}

/// Port for the external text generator that attaches a fun fact to a
/// freshly requested song.
///
/// Implementations may be slow or fail; the core never waits on them before
/// committing a request.
#[async_trait]
pub trait FactProvider: Send + Sync {
  fn name(&self) -> &str;

  async fn get_fact(&self, title: &str, artist: &str) -> Result<String, EnrichmentError>;
}
