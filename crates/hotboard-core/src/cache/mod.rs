//! Rank cache: per-response aggregates plus the published top lists.
//!
//! # Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          RankCache                            │
//! │                                                               │
//! │   aggregates: ResponseId ──► ResponseAggregate  (last write   │
//! │                                                  wins)        │
//! │                                                               │
//! │   top lists:  Hot       ──► Arc<TopList>  (swapped whole)     │
//! │               MostVoted ──► Arc<TopList>  (swapped whole)     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Aggregate writes and list publishes are independent of each other. A published
//! list is an immutable snapshot replaced in one step, so readers observe either the
//! old list or the new one in full.
//!
//! # Backends
//!
//! - [`MemoryRankCache`]: `DashMap` for aggregates, one `ArcSwap` per ranking.
//! - [`RedisRankCache`]: hash per response, one JSON string key per ranking written
//!   by a Lua script that bumps the version and `SET`s the snapshot together.
//!
//! # Failure Semantics
//!
//! Every method returns [`CacheError`] when the backend cannot serve it. The cache is
//! never the source of truth, so callers degrade to the score store instead of failing.
//!
//! # Maintenance
//!
//! [`RankCache::flush`] requires a [`MaintenanceGrant`], which only a verified
//! [`AdminToken`] can mint.

mod config;
mod grant;
mod memory;
mod redis_cache;

pub use config::{CacheBackend, CacheError, RankCacheConfig};
pub use grant::{AdminToken, MaintenanceGrant};
pub use memory::MemoryRankCache;
pub use redis_cache::RedisRankCache;

use crate::types::{RankingKind, ResponseAggregate, ResponseId, TopList};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Point-in-time cache statistics for the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub backend: String,
    pub aggregate_entries: u64,
    pub hot_list_len: usize,
    pub hot_list_version: u64,
    pub most_voted_list_len: usize,
    pub most_voted_list_version: u64,
    pub hits: u64,
    pub misses: u64,
}

#[async_trait]
pub trait RankCache: Send + Sync {
    /// Short backend name for logs and stats.
    fn backend(&self) -> &'static str;

    /// Cached aggregate for `response_id`, or `None` on a miss.
    async fn get_aggregate(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<ResponseAggregate>, CacheError>;

    /// Overwrites the aggregate keyed by `aggregate.response_id`.
    async fn set_aggregate(&self, aggregate: &ResponseAggregate) -> Result<(), CacheError>;

    /// Publishes `ids` (truncated to the configured maximum) as the new `kind` ranking
    /// and returns the published snapshot.
    async fn replace_top_list(
        &self,
        kind: RankingKind,
        ids: Vec<ResponseId>,
    ) -> Result<Arc<TopList>, CacheError>;

    /// The last published `kind` ranking, or an unpublished (version 0) empty list.
    async fn get_top_list(&self, kind: RankingKind) -> Result<Arc<TopList>, CacheError>;

    /// Drops every aggregate and every published list.
    async fn flush(&self, grant: &MaintenanceGrant) -> Result<(), CacheError>;

    async fn stats(&self) -> Result<CacheStats, CacheError>;
}
