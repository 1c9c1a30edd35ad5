//! Admin API request and response bodies.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminApiError {
    pub error: String,
}

impl AdminApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheStatsResponse {
    pub backend: String,
    pub aggregate_entries: u64,
    pub hot_list_len: usize,
    pub hot_list_version: u64,
    pub most_voted_list_len: usize,
    pub most_voted_list_version: u64,
    pub hits: u64,
    pub misses: u64,
    /// Percentage of aggregate lookups served from the cache.
    pub hit_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FlushResponse {
    pub flushed: bool,
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RebuildResponse {
    pub candidates: usize,
    pub hot: Vec<i64>,
    pub most_voted: Vec<i64>,
    pub computed_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationStatsResponse {
    pub subscribers: usize,
    pub connections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BroadcastRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BroadcastResponse {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: u64,
    pub cache_backend: String,
    pub top_n: usize,
    pub default_ranking: String,
    pub live_connections: usize,
}
