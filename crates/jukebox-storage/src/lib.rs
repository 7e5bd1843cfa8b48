pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod schema;
pub mod sqlite;

pub use config::StorageConfig;
pub use error::StorageError;
pub use memory::{MemoryBridge, MemoryBus};
pub use sqlite::SqliteLedgerStore;
