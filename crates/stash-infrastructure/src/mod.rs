//! # Infrastructure Layer
//!
//! Cross-cutting concerns around the cache services: configuration,
//! logging, health and the composition root that wires everything.
//!
//! ## Module Categories
//!
//! ### Configuration
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Figment-layered `stash.toml` + `STASH_*` environment |
//! | [`constants`] | Infrastructure constants |
//!
//! ### Observability
//! | Module | Description |
//! |--------|-------------|
//! | [`health`] | Health checks and registry |
//! | [`logging`] | Structured logging with tracing |
//! | [`system_metrics`] | sysinfo-backed process metrics for the monitor |
//!
//! ### Composition
//! | Module | Description |
//! |--------|-------------|
//! | [`bootstrap`] | `CacheContext` built from `AppConfig` |
//! | [`error_ext`] | Context extension for foreign errors |

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod error_ext;
pub mod health;
pub mod logging;
pub mod system_metrics;

pub use bootstrap::{CacheContext, init_cache};
pub use config::{AppConfig, ConfigBuilder, ConfigLoader};
pub use error_ext::ErrorContext;
