//! Where the jukebox keeps its files and how `jukebox.toml` is read and
//! written. Each crate owns its own section and (de)serializes it through
//! [`ConfigBackend`].

mod backend;
mod error;
mod io;
mod paths;

pub use backend::{ConfigBackend, TomlConfigBackend};
pub use error::ConfigError;
pub use io::atomic_write_str;
pub use paths::{BASE_DIR_ENV, JukeboxPaths};
