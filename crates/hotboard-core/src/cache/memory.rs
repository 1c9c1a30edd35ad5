use super::{CacheError, CacheStats, MaintenanceGrant, RankCache};
use crate::types::{RankingKind, ResponseAggregate, ResponseId, TopList};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::debug;

/// Process-local rank cache.
///
/// Aggregates live in a `DashMap` (sharded locking, no cross-key contention). Each
/// ranking is an `ArcSwap<TopList>`: publishing builds a new immutable snapshot and
/// swaps the pointer, readers clone the `Arc` without taking a lock.
pub struct MemoryRankCache {
    aggregates: DashMap<ResponseId, ResponseAggregate>,
    hot: ArcSwap<TopList>,
    most_voted: ArcSwap<TopList>,
    max_list_len: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryRankCache {
    #[must_use]
    pub fn new(max_list_len: usize) -> Self {
        Self {
            aggregates: DashMap::new(),
            hot: ArcSwap::from_pointee(TopList::unpublished(RankingKind::Hot)),
            most_voted: ArcSwap::from_pointee(TopList::unpublished(RankingKind::MostVoted)),
            max_list_len: max_list_len.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn max_list_len(&self) -> usize {
        self.max_list_len
    }

    fn slot(&self, kind: RankingKind) -> &ArcSwap<TopList> {
        match kind {
            RankingKind::Hot => &self.hot,
            RankingKind::MostVoted => &self.most_voted,
        }
    }

    /// Synchronous publish used by the async trait method and by benchmarks.
    pub fn publish(&self, kind: RankingKind, mut ids: Vec<ResponseId>) -> Arc<TopList> {
        ids.truncate(self.max_list_len);
        let published_at = Some(Utc::now());

        let mut published = None;
        // rcu retries on a concurrent swap, so versions stay strictly increasing.
        self.slot(kind).rcu(|current| {
            let next = Arc::new(TopList {
                kind,
                version: current.version + 1,
                ids: ids.clone(),
                published_at,
            });
            published = Some(Arc::clone(&next));
            next
        });

        let published = published.unwrap_or_else(|| self.slot(kind).load_full());
        debug!(
            ranking = %kind,
            version = published.version,
            entries = published.ids.len(),
            "top list published"
        );
        published
    }

    /// Synchronous snapshot read.
    #[must_use]
    pub fn snapshot(&self, kind: RankingKind) -> Arc<TopList> {
        self.slot(kind).load_full()
    }
}

impl Default for MemoryRankCache {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl RankCache for MemoryRankCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_aggregate(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<ResponseAggregate>, CacheError> {
        let found = self.aggregates.get(&response_id).map(|entry| entry.value().clone());
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(found)
    }

    async fn set_aggregate(&self, aggregate: &ResponseAggregate) -> Result<(), CacheError> {
        self.aggregates.insert(aggregate.response_id, aggregate.clone());
        Ok(())
    }

    async fn replace_top_list(
        &self,
        kind: RankingKind,
        ids: Vec<ResponseId>,
    ) -> Result<Arc<TopList>, CacheError> {
        Ok(self.publish(kind, ids))
    }

    async fn get_top_list(&self, kind: RankingKind) -> Result<Arc<TopList>, CacheError> {
        Ok(self.snapshot(kind))
    }

    async fn flush(&self, _grant: &MaintenanceGrant) -> Result<(), CacheError> {
        self.aggregates.clear();
        for kind in RankingKind::ALL {
            self.slot(kind).store(Arc::new(TopList::unpublished(kind)));
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let hot = self.hot.load();
        let most_voted = self.most_voted.load();
        Ok(CacheStats {
            backend: self.backend().to_string(),
            aggregate_entries: self.aggregates.len() as u64,
            hot_list_len: hot.ids.len(),
            hot_list_version: hot.version,
            most_voted_list_len: most_voted.ids.len(),
            most_voted_list_version: most_voted.version,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }
}
