//! Application Layer - Stash
//!
//! Cache services built on the [`CacheBackend`](stash_domain::CacheBackend)
//! port. Nothing here knows which backend is in use.
//!
//! ## Services
//!
//! | Service | Role |
//! |---------|------|
//! | [`CacheManager`] | Key prefixing, backend selection, `remember`, counters |
//! | [`StrategyManager`] | TTL metadata, tag index, bulk invalidation |
//! | [`RefreshManager`] | One background refresh worker per key |
//! | [`PenetrationGuard`] | Per-key request coalescing and null-value caching |
//! | [`CacheMonitor`] | Periodic snapshots, threshold alerts, expiry sweep |
//!
//! ## Dependencies
//!
//! This crate depends only on:
//! - `stash-domain`: for entities, value objects and port traits
//! - Pure Rust libraries for async, serialization, etc.

pub mod services;

pub use services::*;
