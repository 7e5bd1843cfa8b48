use std::fmt;

use thiserror::Error;

use crate::domain::SongId;

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
  Blacklisted,
  Cooldown,
}

impl fmt::Display for RejectReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RejectReason::Blacklisted => write!(f, "blacklisted"),
      RejectReason::Cooldown => write!(f, "cooldown"),
    }
  }
}

/// Errors surfaced by the jukebox core.
///
/// Callers decide how loud each one is: `Rejected` is meant for the customer,
/// `NotFound` is usually a benign race between two DJ screens and can be
/// swallowed.
#[derive(Debug, Error)]
pub enum CoreError {
  #[error("\"{title}\" cannot be requested right now ({reason})")]
  Rejected { title: String, reason: RejectReason },

  #[error("no active request for {0}")]
  NotFound(SongId),

  #[error("invalid username or password")]
  InvalidCredentials,

  #[error("DJ login required")]
  NotAuthorized,
}

impl CoreError {
  pub fn rejected(title: impl Into<String>, reason: RejectReason) -> Self {
    CoreError::Rejected { title: title.into(), reason }
  }
}
