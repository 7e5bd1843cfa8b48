pub mod identity;
pub mod records;
pub mod time;

pub use identity::{SongId, resolve};
pub use records::{BlacklistRecord, CooldownRecord, RequestRecord};
pub use time::Timestamp;
