//! Composition root
//!
//! [`CacheContext`] is built once at startup from an [`AppConfig`] and
//! passed explicitly to whatever needs the cache; nothing is global.
//!
//! ```text
//! AppConfig → BackendRegistry → backends ─┐
//!                                         ├→ CacheManager → StrategyManager → RefreshManager
//!                                         │              └→ PenetrationGuard
//!                                         └→ CacheMonitor (sysinfo) · HealthRegistry
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = ConfigLoader::new().load()?;
//! let context = init_cache(config).await?;
//! context.start().await?;
//! context.cache().set("k", json!(1), None).await?;
//! context.shutdown().await;
//! ```

use crate::config::AppConfig;
use crate::config::loader::validate_app_config;
use crate::health::HealthRegistry;
use crate::health::checkers::{CacheHealthChecker, SystemHealthChecker};
use crate::system_metrics::SysinfoMetricsCollector;
use stash_application::{
    CacheManager, CacheMonitor, PenetrationGuard, RefreshManager, StrategyManager,
};
use stash_domain::error::Result;
use stash_domain::ports::infrastructure::SystemMetricsCollector;
use stash_domain::ports::providers::cache::CacheBackend;
use stash_providers::BackendRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Every cache service, wired from one configuration
#[derive(Debug)]
pub struct CacheContext {
    config: Arc<AppConfig>,
    cache: Arc<CacheManager>,
    strategy: Arc<StrategyManager>,
    guard: Arc<PenetrationGuard>,
    refresh: Arc<RefreshManager>,
    monitor: Arc<CacheMonitor>,
    health: HealthRegistry,
}

/// Build a [`CacheContext`] with the built-in backends
pub async fn init_cache(config: AppConfig) -> Result<CacheContext> {
    CacheContext::build(
        config,
        &BackendRegistry::new(),
        Arc::new(SysinfoMetricsCollector::new()),
    )
    .await
}

impl CacheContext {
    /// Validate `config`, construct every backend it names and wire the services
    ///
    /// Fails before anything starts on invalid configuration or when a
    /// backend cannot be constructed.
    pub async fn build(
        config: AppConfig,
        registry: &BackendRegistry,
        system: Arc<dyn SystemMetricsCollector>,
    ) -> Result<Self> {
        validate_app_config(&config)?;

        let kinds = config.cache.backend_kinds()?;
        let backend_config = config.cache.backend_config();
        let mut backends: HashMap<String, Arc<dyn CacheBackend>> = HashMap::new();
        for kind in &kinds {
            backends.insert(
                kind.as_str().to_string(),
                registry.resolve(*kind, &backend_config)?,
            );
        }
        let default_backend = config.cache.backend_kind()?;

        let cache = Arc::new(CacheManager::with_default_ttl(
            config.cache.prefix.clone(),
            default_backend.as_str(),
            backends,
            config.cache.default_ttl(),
        )?);
        let strategy = Arc::new(StrategyManager::new(Arc::clone(&cache)));
        let guard = Arc::new(PenetrationGuard::with_null_ttl(
            Arc::clone(&cache),
            config.guard.null_ttl(),
        ));
        let refresh = Arc::new(RefreshManager::with_error_cooldown(
            Arc::clone(&strategy),
            config.refresh.error_cooldown(),
        ));
        let monitor = Arc::new(
            CacheMonitor::new(
                Arc::clone(&cache),
                system,
                config.monitor.to_monitor_config(),
            )?
            .with_strategy(Arc::clone(&strategy)),
        );

        let health = HealthRegistry::new();
        for name in cache.backend_names() {
            let handle = cache.using(&name)?;
            health
                .register_checker(format!("cache:{name}"), CacheHealthChecker::new(handle))
                .await;
        }
        health
            .register_checker("system", SystemHealthChecker::new())
            .await;

        info!(
            default_backend = %default_backend,
            backends = ?cache.backend_names(),
            prefix = %config.cache.prefix,
            "cache context ready"
        );
        Ok(Self {
            config: Arc::new(config),
            cache,
            strategy,
            guard,
            refresh,
            monitor,
            health,
        })
    }

    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn strategy(&self) -> &Arc<StrategyManager> {
        &self.strategy
    }

    pub fn guard(&self) -> &Arc<PenetrationGuard> {
        &self.guard
    }

    pub fn refresh(&self) -> &Arc<RefreshManager> {
        &self.refresh
    }

    pub fn monitor(&self) -> &Arc<CacheMonitor> {
        &self.monitor
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Start the background monitor when enabled
    pub async fn start(&self) -> Result<()> {
        if self.config.monitor.enabled {
            self.monitor.start().await?;
        } else {
            info!("cache monitor disabled");
        }
        Ok(())
    }

    /// Stop refresh workers and the monitor
    ///
    /// Returns `true` when every background task stopped within
    /// `refresh.shutdown_timeout_secs`.
    pub async fn shutdown(&self) -> bool {
        let timeout = self.config.refresh.shutdown_timeout();
        info!(timeout_secs = timeout.as_secs(), "shutting down cache services");
        let refresh_clean = self.refresh.shutdown(timeout).await;
        let monitor_clean = self.monitor.stop(timeout).await;
        refresh_clean && monitor_clean
    }
}
