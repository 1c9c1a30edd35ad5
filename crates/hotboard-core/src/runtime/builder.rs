//! Builder for wiring the runtime from configuration, with test overrides.

use crate::{
    cache::{CacheBackend, CacheError, MemoryRankCache, RankCache, RedisRankCache},
    config::AppConfig,
    leaderboard::Leaderboard,
    metrics::MetricsCollector,
    notify::NotificationHub,
    refresher::{RankRefresher, RefresherDeps, RefresherOptions},
    scoring::{Clock, ScoreEngine, SystemClock},
    store::{ScoreStore, SqliteScoreStore, StoreError, TimedScoreStore},
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{lifecycle::HotboardRuntime, HotboardComponents};

/// Errors that can occur during runtime initialization.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    #[error("Failed to open score store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to connect rank cache: {0}")]
    Cache(#[from] CacheError),

    /// Generic initialization error
    #[error("Runtime initialization failed: {0}")]
    Initialization(String),
}

/// Builder for constructing a [`HotboardRuntime`].
///
/// Store, cache and clock default to what the configuration selects; tests swap
/// them for in-memory or failing doubles.
pub struct HotboardRuntimeBuilder {
    config: Option<AppConfig>,
    store: Option<Arc<dyn ScoreStore>>,
    cache: Option<Arc<dyn RankCache>>,
    clock: Option<Arc<dyn Clock>>,
    start_workers: bool,
    shutdown_channel_capacity: usize,
}

impl Default for HotboardRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HotboardRuntimeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: None,
            store: None,
            cache: None,
            clock: None,
            start_workers: true,
            shutdown_channel_capacity: 16,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the configured `SQLite` store. The store timeout still applies.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ScoreStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the configured cache backend.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn RankCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Skips spawning the refresher workers. Vote events then queue until a
    /// caller drives the refresher directly.
    #[must_use]
    pub fn without_workers(mut self) -> Self {
        self.start_workers = false;
        self
    }

    #[must_use]
    pub fn with_shutdown_channel_capacity(mut self, capacity: usize) -> Self {
        self.shutdown_channel_capacity = capacity.max(1);
        self
    }

    /// Validates the configuration, connects backends and starts the workers.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if validation fails or a backend cannot be reached.
    pub async fn build(self) -> Result<HotboardRuntime, RuntimeError> {
        let config = self.config.unwrap_or_default();
        config.validate().map_err(RuntimeError::ConfigValidation)?;
        info!(
            cache_backend = ?config.cache.backend,
            top_n = config.ranking.top_n,
            "initializing hotboard runtime"
        );

        let metrics = Arc::new(MetricsCollector::new());
        let engine = ScoreEngine::new(config.scoring.clone());
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let inner_store: Arc<dyn ScoreStore> = match self.store {
            Some(store) => store,
            None => Arc::new(SqliteScoreStore::connect(&config.store).await?),
        };
        let store: Arc<dyn ScoreStore> =
            Arc::new(TimedScoreStore::new(inner_store, config.store.timeout()));
        debug!(database_url = %config.store.database_url, "score store ready");

        let cache: Arc<dyn RankCache> = match self.cache {
            Some(cache) => cache,
            None => match config.cache.backend {
                CacheBackend::Memory => Arc::new(MemoryRankCache::new(config.cache.max_list_len)),
                CacheBackend::Redis => Arc::new(RedisRankCache::connect(&config.cache).await?),
            },
        };
        debug!(backend = cache.backend(), "rank cache ready");

        let hub = Arc::new(NotificationHub::new(&config.notifications, Arc::clone(&metrics)));

        let refresher = Arc::new(RankRefresher::new(
            RefresherDeps {
                engine: engine.clone(),
                store: Arc::clone(&store),
                cache: Arc::clone(&cache),
                hub: Arc::clone(&hub),
                clock: Arc::clone(&clock),
                metrics: Arc::clone(&metrics),
            },
            RefresherOptions {
                config: config.refresher.clone(),
                top_n: config.ranking.top_n,
                notify_authors: config.notifications.notify_authors,
                broadcast_rankings: config.notifications.broadcast_rankings,
            },
        ));

        let leaderboard = Arc::new(
            Leaderboard::new(
                engine,
                Arc::clone(&store),
                Arc::clone(&cache),
                Arc::clone(&refresher),
                clock,
                Arc::clone(&metrics),
            )
            .with_concurrency(config.refresher.max_concurrent_refreshes),
        );

        let admin_token = config.admin.admin_token();
        if config.admin.enabled && admin_token.is_none() {
            info!("no admin token configured, privileged operations are disabled");
        }

        let components = HotboardComponents {
            config: Arc::new(config),
            store,
            cache,
            hub,
            refresher,
            leaderboard,
            metrics,
            admin_token,
        };

        let (shutdown_tx, _) = broadcast::channel(self.shutdown_channel_capacity);
        let runtime = HotboardRuntime::new(components, shutdown_tx, self.start_workers);
        info!("hotboard runtime initialized");
        Ok(runtime)
    }
}
