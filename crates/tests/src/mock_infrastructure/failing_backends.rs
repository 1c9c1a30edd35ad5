//! Store and cache doubles that fail on demand.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotboard_core::{
    cache::{CacheError, CacheStats, MaintenanceGrant, RankCache},
    store::{InMemoryScoreStore, ScoreStore, StoreError},
    types::{RankingKind, ResponseAggregate, ResponseId, SubscriberId, TopList, Vote},
};
use parking_lot::RwLock;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// How a [`FlakyScoreStore`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreMode {
    #[default]
    Healthy,
    /// Every call returns `StoreError::Unavailable`.
    Failing,
    /// Every call waits forever. Pair with `TimedScoreStore`.
    Hanging,
}

/// In-memory score store whose reads can be switched off.
#[derive(Debug, Default)]
pub struct FlakyScoreStore {
    inner: InMemoryScoreStore,
    mode: RwLock<StoreMode>,
    calls: AtomicUsize,
}

impl FlakyScoreStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, for seeding responses and votes.
    #[must_use]
    pub fn data(&self) -> &InMemoryScoreStore {
        &self.inner
    }

    pub fn set_mode(&self, mode: StoreMode) {
        *self.mode.write() = mode;
    }

    pub fn fail(&self) {
        self.set_mode(StoreMode::Failing);
    }

    pub fn heal(&self) {
        self.set_mode(StoreMode::Healthy);
    }

    /// Store calls made so far, whatever their outcome.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    async fn gate(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mode = *self.mode.read();
        match mode {
            StoreMode::Healthy => Ok(()),
            StoreMode::Failing => Err(StoreError::Unavailable("injected failure".to_string())),
            StoreMode::Hanging => std::future::pending().await,
        }
    }
}

#[async_trait]
impl ScoreStore for FlakyScoreStore {
    async fn list_votes(&self, response_id: ResponseId) -> Result<Vec<Vote>, StoreError> {
        self.gate().await?;
        self.inner.list_votes(response_id).await
    }

    async fn get_response_created_at(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.gate().await?;
        self.inner.get_response_created_at(response_id).await
    }

    async fn list_candidate_responses(&self) -> Result<Vec<ResponseId>, StoreError> {
        self.gate().await?;
        self.inner.list_candidate_responses().await
    }

    async fn get_response_author(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<SubscriberId>, StoreError> {
        self.gate().await?;
        self.inner.get_response_author(response_id).await
    }
}

/// A rank cache whose backend is permanently down.
#[derive(Debug, Default)]
pub struct UnavailableRankCache {
    calls: AtomicUsize,
}

impl UnavailableRankCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn down<T>(&self) -> Result<T, CacheError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl RankCache for UnavailableRankCache {
    fn backend(&self) -> &'static str {
        "unavailable"
    }

    async fn get_aggregate(
        &self,
        _response_id: ResponseId,
    ) -> Result<Option<ResponseAggregate>, CacheError> {
        self.down()
    }

    async fn set_aggregate(&self, _aggregate: &ResponseAggregate) -> Result<(), CacheError> {
        self.down()
    }

    async fn replace_top_list(
        &self,
        _kind: RankingKind,
        _ids: Vec<ResponseId>,
    ) -> Result<Arc<TopList>, CacheError> {
        self.down()
    }

    async fn get_top_list(&self, _kind: RankingKind) -> Result<Arc<TopList>, CacheError> {
        self.down()
    }

    async fn flush(&self, _grant: &MaintenanceGrant) -> Result<(), CacheError> {
        self.down()
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        self.down()
    }
}
