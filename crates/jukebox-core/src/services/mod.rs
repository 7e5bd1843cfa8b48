pub mod dj_gate;
pub mod enricher;
pub mod lifecycle;

pub use dj_gate::{DjCredentials, DjGate};
pub use enricher::{Enricher, FactNotice, FactNotices};
pub use lifecycle::{LifecycleCoordinator, LifecycleSettings, RestoreReport};
