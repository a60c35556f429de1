//! # Stash
//!
//! Pluggable caching: memory, file and Redis backends behind one manager,
//! with tag and pattern invalidation, background refresh, per-key request
//! coalescing and threshold alerting.
//!
//! ## Example
//!
//! ```ignore
//! use stash::infrastructure::{ConfigLoader, init_cache};
//! use serde_json::json;
//!
//! let context = init_cache(ConfigLoader::new().load()?).await?;
//! context
//!     .strategy()
//!     .set_with_strategy("u:1", json!({"plan": "premium"}), None, ["premium"])
//!     .await?;
//! context.strategy().invalidate_by_tag("premium").await?;
//! ```
//!
//! ## Architecture
//!
//! - `domain` - entries, metrics, errors and the backend port
//! - `services` - manager, strategy, refresh, guard and monitor
//! - `providers` - backend implementations and registry
//! - `infrastructure` - configuration, logging, health, composition root

/// Domain layer - entries, metrics, errors and ports
pub mod domain {
    pub use stash_domain::*;
}

/// Application layer - cache services
pub mod services {
    pub use stash_application::*;
}

/// Backend implementations and registry
pub mod providers {
    pub use stash_providers::*;
}

/// Infrastructure layer - config, logging, health and bootstrap
pub mod infrastructure {
    pub use stash_infrastructure::*;
}

pub mod cli;

// Re-export commonly used types at the crate root
pub use domain::{CacheBackend, Error, Result};
pub use infrastructure::{CacheContext, init_cache};
pub use services::{CacheManager, PenetrationGuard, RefreshManager, StrategyManager};
