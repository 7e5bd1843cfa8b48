pub mod domain;
pub mod errors;
pub mod ledger;
pub mod ports;
pub mod services;

pub use errors::{CoreError, RejectReason};
