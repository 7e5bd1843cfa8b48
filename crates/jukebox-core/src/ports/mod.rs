pub mod clock;
pub mod enrichment;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use enrichment::{EnrichmentError, FactProvider};
pub use sync::{
  ChangeFeed, Envelope, ExternalChange, ExternalChanges, InstanceId, LedgerKey, LedgerSnapshot,
  SyncBridge, SyncError,
};
