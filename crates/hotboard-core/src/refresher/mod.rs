//! Keeps the rank cache in step with the score store.
//!
//! # Entry Points
//!
//! - [`RankRefresher::notify_vote_recorded`]: the write trigger, called after a vote is
//!   durably stored. Never blocks; the event is queued for the vote worker.
//! - [`RankRefresher::on_vote_recorded`]: recomputes one response's aggregate, writes it,
//!   schedules a ranking rebuild and pushes a `score_updated` message to the author.
//! - [`RankRefresher::rebuild_top_list`]: recomputes every candidate and republishes
//!   both rankings wholesale.
//!
//! # Background Workers
//!
//! ```text
//!  notify_vote_recorded ──try_send──► vote queue ──► vote worker ──spawn──► on_vote_recorded
//!                                                      (semaphore)              │
//!                                                                      request_rebuild
//!                                                                               ▼
//!                    interval tick ───────────────────────────────► rebuild worker
//!                                                                 (debounce, then rebuild)
//! ```
//!
//! # Failure Policy
//!
//! A store failure or timeout abandons the refresh. Nothing already cached is cleared
//! or partially overwritten, so readers keep getting the last good value. Cache write
//! failures are logged and dropped.

mod compute;

pub use compute::{compute_rankings, recompute_aggregate, Rankings};

use crate::{
    cache::RankCache,
    metrics::MetricsCollector,
    notify::{Notification, NotificationHub},
    scoring::{Clock, ScoreEngine},
    store::{ScoreStore, StoreError},
    types::{RankingKind, ResponseAggregate, ResponseId},
};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, Notify, Semaphore},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Response {0} not found")]
    ResponseNotFound(ResponseId),
}

impl RefreshError {
    fn as_metric_str(&self) -> &'static str {
        match self {
            Self::Store(StoreError::Timeout(_)) => "store_timeout",
            Self::Store(_) => "store_unavailable",
            Self::ResponseNotFound(_) => "not_found",
        }
    }
}

/// Refresher scheduling.
///
/// # Rebuild triggers
///
/// - **Per vote**: with `debounce_ms = 0` every processed vote rebuilds inline;
///   otherwise requests within the window collapse into one rebuild.
/// - **Periodic**: every `rebuild_interval_seconds` (0 disables). Also covers vote
///   events dropped because the queue was full.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefresherConfig {
    /// Debounce window for vote-triggered rebuilds in milliseconds (default: 250)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Full rebuild interval in seconds (default: 60, 0 to disable)
    #[serde(default = "default_rebuild_interval_seconds")]
    pub rebuild_interval_seconds: u64,

    /// Concurrent per-vote refreshes and per-candidate store reads (default: 16)
    #[serde(default = "default_max_concurrent_refreshes")]
    pub max_concurrent_refreshes: usize,

    /// Pending vote events before new ones are dropped (default: 1024)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_debounce_ms() -> u64 {
    250
}
fn default_rebuild_interval_seconds() -> u64 {
    60
}
fn default_max_concurrent_refreshes() -> usize {
    16
}
fn default_queue_capacity() -> usize {
    1024
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            rebuild_interval_seconds: default_rebuild_interval_seconds(),
            max_concurrent_refreshes: default_max_concurrent_refreshes(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl RefresherConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_refreshes == 0 {
            return Err("refresher.max_concurrent_refreshes must be greater than 0".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("refresher.queue_capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Collaborators of a [`RankRefresher`].
pub struct RefresherDeps {
    pub engine: ScoreEngine,
    pub store: Arc<dyn ScoreStore>,
    pub cache: Arc<dyn RankCache>,
    pub hub: Arc<NotificationHub>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<MetricsCollector>,
}

/// Behaviour switches of a [`RankRefresher`].
#[derive(Debug, Clone)]
pub struct RefresherOptions {
    pub config: RefresherConfig,
    /// Length of the rankings rebuilt by the workers.
    pub top_n: usize,
    pub notify_authors: bool,
    pub broadcast_rankings: bool,
}

impl Default for RefresherOptions {
    fn default() -> Self {
        Self {
            config: RefresherConfig::default(),
            top_n: 10,
            notify_authors: true,
            broadcast_rankings: true,
        }
    }
}

pub struct RankRefresher {
    engine: ScoreEngine,
    store: Arc<dyn ScoreStore>,
    cache: Arc<dyn RankCache>,
    hub: Arc<NotificationHub>,
    clock: Arc<dyn Clock>,
    metrics: Arc<MetricsCollector>,
    options: RefresherOptions,
    /// Serializes rebuilds so publishes land in computation order.
    rebuild_lock: tokio::sync::Mutex<()>,
    rebuild_requested: Notify,
    vote_tx: mpsc::Sender<ResponseId>,
    vote_rx: Mutex<Option<mpsc::Receiver<ResponseId>>>,
}

impl RankRefresher {
    #[must_use]
    pub fn new(deps: RefresherDeps, options: RefresherOptions) -> Self {
        let (vote_tx, vote_rx) = mpsc::channel(options.config.queue_capacity.max(1));
        Self {
            engine: deps.engine,
            store: deps.store,
            cache: deps.cache,
            hub: deps.hub,
            clock: deps.clock,
            metrics: deps.metrics,
            options,
            rebuild_lock: tokio::sync::Mutex::new(()),
            rebuild_requested: Notify::new(),
            vote_tx,
            vote_rx: Mutex::new(Some(vote_rx)),
        }
    }

    #[must_use]
    pub fn top_n(&self) -> usize {
        self.options.top_n
    }

    /// Write trigger. Queues the event and returns immediately.
    ///
    /// Returns `false` when the event was dropped (queue full or workers stopped); a
    /// full rebuild is requested in that case so the response is still picked up.
    pub fn notify_vote_recorded(&self, response_id: ResponseId) -> bool {
        match self.vote_tx.try_send(response_id) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(response_id = %response_id, "vote queue full, dropping event and scheduling rebuild");
                self.metrics.record_vote_event_dropped();
                self.rebuild_requested.notify_one();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(response_id = %response_id, "vote worker stopped, dropping event");
                self.metrics.record_vote_event_dropped();
                false
            }
        }
    }

    /// Recomputes and caches one response's aggregate, then schedules a rebuild and
    /// notifies the author.
    ///
    /// On a store failure the error is returned and the cache is left untouched.
    pub async fn on_vote_recorded(
        &self,
        response_id: ResponseId,
    ) -> Result<ResponseAggregate, RefreshError> {
        let now = self.clock.now();
        let aggregate =
            match recompute_aggregate(&self.engine, self.store.as_ref(), response_id, now).await {
                Ok(aggregate) => aggregate,
                Err(e) => {
                    warn!(
                        response_id = %response_id,
                        error = %e,
                        "refresh abandoned, keeping cached aggregate"
                    );
                    self.metrics.record_refresh_failure(e.as_metric_str());
                    return Err(e);
                }
            };

        self.metrics.record_vote_processed();
        if let Err(e) = self.cache.set_aggregate(&aggregate).await {
            warn!(response_id = %response_id, error = %e, "aggregate cache write dropped");
            self.metrics.record_refresh_failure("cache_write");
        }
        debug!(
            response_id = %response_id,
            score = aggregate.score,
            votes_count = aggregate.votes_count,
            hot_score = aggregate.hot_score,
            "aggregate refreshed"
        );

        self.request_rebuild().await;

        if self.options.notify_authors {
            self.notify_author(&aggregate).await;
        }
        Ok(aggregate)
    }

    async fn request_rebuild(&self) {
        if self.options.config.debounce_ms == 0 {
            self.run_scheduled_rebuild("vote").await;
        } else {
            self.rebuild_requested.notify_one();
        }
    }

    async fn notify_author(&self, aggregate: &ResponseAggregate) {
        let author = match self.store.get_response_author(aggregate.response_id).await {
            Ok(Some(author)) => author,
            Ok(None) => return,
            Err(e) => {
                debug!(response_id = %aggregate.response_id, error = %e, "author lookup failed, skipping notification");
                return;
            }
        };
        let message = Notification::score_updated(aggregate);
        let report = self.hub.send_to(author, message.to_payload()).await;
        self.metrics.record_notifications_sent(message.kind(), report.delivered);
    }

    /// Recomputes every candidate and republishes both rankings.
    ///
    /// Fresh aggregates are written back to the cache. If any store read fails, the
    /// rebuild is abandoned and the published rankings are left as they were.
    pub async fn rebuild_top_list(&self, limit: usize) -> Result<Rankings, RefreshError> {
        let _guard = self.rebuild_lock.lock().await;
        let started = Instant::now();

        let result = compute_rankings(
            &self.engine,
            self.store.as_ref(),
            limit,
            self.options.config.max_concurrent_refreshes,
            self.clock.now(),
        )
        .await;

        let rankings = match result {
            Ok(rankings) => rankings,
            Err(e) => {
                warn!(error = %e, "ranking rebuild abandoned, keeping published lists");
                self.metrics.record_refresh_failure(e.as_metric_str());
                self.metrics.record_rebuild(false, started.elapsed());
                return Err(e);
            }
        };

        let writes = join_all(rankings.aggregates.iter().map(|a| self.cache.set_aggregate(a))).await;
        let failed_writes = writes.iter().filter(|r| r.is_err()).count();
        if failed_writes > 0 {
            warn!(failed = failed_writes, "aggregate cache writes dropped during rebuild");
            self.metrics.record_refresh_failure("cache_write");
        }

        for kind in RankingKind::ALL {
            self.publish(kind, rankings.ids(kind).to_vec()).await;
        }

        self.metrics.record_rebuild(true, started.elapsed());
        debug!(
            candidates = rankings.aggregates.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "rankings rebuilt"
        );
        Ok(rankings)
    }

    async fn publish(&self, kind: RankingKind, ids: Vec<ResponseId>) {
        let previous = self.cache.get_top_list(kind).await.ok();
        let published = match self.cache.replace_top_list(kind, ids).await {
            Ok(published) => published,
            Err(e) => {
                warn!(ranking = %kind, error = %e, "top list publish dropped");
                self.metrics.record_refresh_failure("cache_write");
                return;
            }
        };

        let changed = previous.is_none_or(|prev| prev.ids != published.ids);
        if changed && self.options.broadcast_rankings {
            let message = Notification::TopListChanged {
                ranking: kind,
                version: published.version,
                ids: published.ids.clone(),
            };
            let report = self.hub.broadcast(message.to_payload()).await;
            self.metrics.record_notifications_sent(message.kind(), report.delivered);
        }
    }

    async fn run_scheduled_rebuild(&self, trigger: &'static str) {
        if let Err(e) = self.rebuild_top_list(self.options.top_n).await {
            debug!(trigger, error = %e, "scheduled rebuild failed");
        }
    }

    /// Spawns the vote worker and the rebuild worker. Both stop on `shutdown_tx`.
    ///
    /// Returns no handles if the workers were already started.
    pub fn start(self: &Arc<Self>, shutdown_tx: &broadcast::Sender<()>) -> Vec<JoinHandle<()>> {
        let Some(vote_rx) = self.vote_rx.lock().take() else {
            warn!("refresher workers already started");
            return Vec::new();
        };

        let vote_worker = tokio::spawn(Arc::clone(self).vote_worker(vote_rx, shutdown_tx.subscribe()));
        let rebuild_worker = tokio::spawn(Arc::clone(self).rebuild_worker(shutdown_tx.subscribe()));

        info!(
            debounce_ms = self.options.config.debounce_ms,
            rebuild_interval_seconds = self.options.config.rebuild_interval_seconds,
            top_n = self.options.top_n,
            "rank refresher started"
        );
        vec![vote_worker, rebuild_worker]
    }

    async fn vote_worker(
        self: Arc<Self>,
        mut vote_rx: mpsc::Receiver<ResponseId>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let permits = Arc::new(Semaphore::new(self.options.config.max_concurrent_refreshes.max(1)));

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("vote worker shutting down");
                    break;
                }

                event = vote_rx.recv() => {
                    let Some(response_id) = event else { break };
                    let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                        error!("refresh semaphore closed");
                        break;
                    };
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        let _permit = permit;
                        // Failures are logged and counted inside.
                        let _ = this.on_vote_recorded(response_id).await;
                    });
                }
            }
        }
    }

    async fn rebuild_worker(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        let debounce = Duration::from_millis(self.options.config.debounce_ms);
        let periodic = self.options.config.rebuild_interval_seconds > 0;
        let mut interval = tokio::time::interval(Duration::from_secs(
            self.options.config.rebuild_interval_seconds.max(1),
        ));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("rebuild worker shutting down");
                    break;
                }

                () = self.rebuild_requested.notified() => {
                    // Requests arriving during the window share this rebuild.
                    tokio::time::sleep(debounce).await;
                    self.run_scheduled_rebuild("debounced").await;
                }

                _ = interval.tick(), if periodic => {
                    self.run_scheduled_rebuild("periodic").await;
                }
            }
        }
    }
}
