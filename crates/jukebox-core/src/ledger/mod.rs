//! In-memory ledgers, one per lifecycle stage.
//!
//! Each ledger keeps its records in insertion order and computes sorted
//! views on demand. Mutation is reserved to the lifecycle coordinator.

pub mod blacklist;
pub mod cooldowns;
pub mod requests;

pub use blacklist::BlacklistLedger;
pub use cooldowns::CooldownLedger;
pub use requests::RequestLedger;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A persisted or replayed ledger blob could not be decoded.
#[derive(Debug, Error)]
#[error("corrupt {ledger} snapshot: {source}")]
pub struct StoreCorrupt {
  pub ledger: &'static str,
  #[source]
  pub source: serde_json::Error,
}

fn decode<T: DeserializeOwned>(
  ledger: &'static str,
  snapshot: &str,
) -> Result<Vec<T>, StoreCorrupt> {
  serde_json::from_str(snapshot).map_err(|source| StoreCorrupt { ledger, source })
}

fn encode<T: Serialize>(records: &[T]) -> String {
  // Plain records of strings and integers always serialize.
  serde_json::to_string(records).unwrap_or_else(|_| "[]".to_string())
}
