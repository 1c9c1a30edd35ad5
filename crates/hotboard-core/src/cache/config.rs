//! Configuration and error types for the rank cache.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a rank cache backend.
///
/// Every variant means the cache could not serve the call. Readers fall back to the
/// score store; writers drop the update with a log entry.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend unreachable or rejected the command
    #[error("Rank cache unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer within the configured bound
    #[error("Rank cache operation timed out after {0:?}")]
    Timeout(Duration),

    /// A stored entry could not be decoded
    #[error("Rank cache entry could not be decoded: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Which rank cache implementation the runtime builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local maps and atomically swapped snapshots
    #[default]
    Memory,
    /// Shared Redis instance
    Redis,
}

/// Rank cache configuration.
///
/// # Top list length
///
/// `max_list_len` bounds every published list. Requests for longer rankings are
/// clamped to it, so it must be at least `ranking.top_n`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankCacheConfig {
    /// Backend selection (default: memory)
    #[serde(default)]
    pub backend: CacheBackend,

    /// Redis connection URL, required for the redis backend
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Prefix for every key the redis backend writes (default: "hotboard")
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Upper bound on published list length (default: 100)
    #[serde(default = "default_max_list_len")]
    pub max_list_len: usize,

    /// Per-operation timeout in milliseconds (default: 500)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_key_prefix() -> String {
    "hotboard".to_string()
}
fn default_max_list_len() -> usize {
    100
}
fn default_timeout_ms() -> u64 {
    500
}

impl Default for RankCacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: None,
            key_prefix: default_key_prefix(),
            max_list_len: default_max_list_len(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RankCacheConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_list_len == 0 {
            return Err("cache.max_list_len must be greater than 0".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("cache.timeout_ms must be greater than 0".to_string());
        }
        if self.backend == CacheBackend::Redis {
            match self.redis_url.as_deref() {
                Some(url) if url.starts_with("redis://") || url.starts_with("rediss://") => {}
                Some(url) => return Err(format!("cache.redis_url is not a redis URL: {url}")),
                None => return Err("cache.redis_url is required for the redis backend".to_string()),
            }
            if self.key_prefix.is_empty() {
                return Err("cache.key_prefix must not be empty for the redis backend".to_string());
            }
        }
        Ok(())
    }
}
