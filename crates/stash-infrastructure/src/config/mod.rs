//! Configuration
//!
//! Layered `stash.toml` configuration: built-in defaults, then the TOML
//! file, then `STASH_*` environment variables.

pub mod loader;
pub mod types;

pub use loader::{ConfigBuilder, ConfigLoader};
pub use types::*;
