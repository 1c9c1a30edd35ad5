//! Read path for the gallery: published rankings and per-response aggregates.
//!
//! Reads are served from the rank cache. When the cache is unreachable they are
//! computed directly from the score store without touching the cache; when nothing
//! has been published yet (cold start, or after a flush) a rebuild is run first so
//! later reads hit the cache again.

use crate::{
    cache::{CacheError, RankCache},
    metrics::{CacheLookup, MetricsCollector},
    refresher::{compute_rankings, recompute_aggregate, RankRefresher, RefreshError},
    scoring::{Clock, ScoreEngine},
    store::{ScoreStore, StoreError},
    types::{RankedResponse, RankingKind, ResponseAggregate, ResponseId},
};
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Response {0} not found")]
    ResponseNotFound(ResponseId),
}

impl From<RefreshError> for LeaderboardError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Store(e) => Self::Store(e),
            RefreshError::ResponseNotFound(id) => Self::ResponseNotFound(id),
        }
    }
}

pub struct Leaderboard {
    engine: ScoreEngine,
    store: Arc<dyn ScoreStore>,
    cache: Arc<dyn RankCache>,
    refresher: Arc<RankRefresher>,
    clock: Arc<dyn Clock>,
    metrics: Arc<MetricsCollector>,
    concurrency: usize,
}

impl Leaderboard {
    #[must_use]
    pub fn new(
        engine: ScoreEngine,
        store: Arc<dyn ScoreStore>,
        cache: Arc<dyn RankCache>,
        refresher: Arc<RankRefresher>,
        clock: Arc<dyn Clock>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self { engine, store, cache, refresher, clock, metrics, concurrency: 16 }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Largest `limit` a ranking read can return.
    #[must_use]
    pub fn max_limit(&self) -> usize {
        self.refresher.top_n()
    }

    /// The first `limit` entries of the `kind` ranking, best first.
    pub async fn get_top_responses(
        &self,
        kind: RankingKind,
        limit: usize,
    ) -> Result<Vec<RankedResponse>, LeaderboardError> {
        let limit = limit.min(self.max_limit());
        if limit == 0 {
            return Ok(Vec::new());
        }

        match self.cache.get_top_list(kind).await {
            Ok(list) if list.is_published() => {
                self.metrics.record_cache_lookup(CacheLookup::Hit);
                let ids: Vec<ResponseId> = list.ids.iter().take(limit).copied().collect();
                Ok(self.rows_for(&ids).await)
            }
            Ok(_) => {
                self.metrics.record_cache_lookup(CacheLookup::Miss);
                self.metrics.record_fallback_read("cold_start");
                debug!(ranking = %kind, "no published ranking, rebuilding before read");
                let rankings = self.refresher.rebuild_top_list(self.max_limit()).await?;
                Ok(Self::rows_from(&rankings.aggregates, rankings.ids(kind), limit))
            }
            Err(e) => {
                self.record_cache_error(&e);
                self.metrics.record_fallback_read("cache_unavailable");
                let rankings = compute_rankings(
                    &self.engine,
                    self.store.as_ref(),
                    limit,
                    self.concurrency,
                    self.clock.now(),
                )
                .await?;
                Ok(Self::rows_from(&rankings.aggregates, rankings.ids(kind), limit))
            }
        }
    }

    /// The current aggregate of one response.
    pub async fn get_aggregate(
        &self,
        response_id: ResponseId,
    ) -> Result<ResponseAggregate, LeaderboardError> {
        match self.cache.get_aggregate(response_id).await {
            Ok(Some(aggregate)) => {
                self.metrics.record_cache_lookup(CacheLookup::Hit);
                Ok(aggregate)
            }
            Ok(None) => {
                self.metrics.record_cache_lookup(CacheLookup::Miss);
                let aggregate = self.recompute(response_id).await?;
                if let Err(e) = self.cache.set_aggregate(&aggregate).await {
                    debug!(response_id = %response_id, error = %e, "cache warm-up write dropped");
                }
                Ok(aggregate)
            }
            Err(e) => {
                self.record_cache_error(&e);
                self.metrics.record_fallback_read("cache_unavailable");
                Ok(self.recompute(response_id).await?)
            }
        }
    }

    async fn recompute(&self, response_id: ResponseId) -> Result<ResponseAggregate, RefreshError> {
        recompute_aggregate(&self.engine, self.store.as_ref(), response_id, self.clock.now()).await
    }

    /// Resolves ranking ids to rows. Rows whose aggregate can be neither read nor
    /// recomputed are left out rather than failing the whole list.
    async fn rows_for(&self, ids: &[ResponseId]) -> Vec<RankedResponse> {
        let rows = join_all(ids.iter().map(|&id| self.get_aggregate(id))).await;
        ids.iter()
            .zip(rows)
            .filter_map(|(id, row)| match row {
                Ok(aggregate) => Some(RankedResponse::from(&aggregate)),
                Err(e) => {
                    warn!(response_id = %id, error = %e, "omitting ranked response without aggregate");
                    None
                }
            })
            .collect()
    }

    fn rows_from(
        aggregates: &[ResponseAggregate],
        ids: &[ResponseId],
        limit: usize,
    ) -> Vec<RankedResponse> {
        ids.iter()
            .take(limit)
            .filter_map(|id| aggregates.iter().find(|a| a.response_id == *id))
            .map(RankedResponse::from)
            .collect()
    }

    fn record_cache_error(&self, err: &CacheError) {
        warn!(backend = self.cache.backend(), error = %err, "rank cache unavailable, reading from store");
        self.metrics.record_cache_lookup(CacheLookup::Error);
    }
}
