//! Read access to the durable vote and response records.
//!
//! The store is the source of truth; everything in the rank cache can be rebuilt
//! from it. This crate only reads: votes are written by the vote-creation service,
//! which then calls the refresher's write trigger.
//!
//! Implementations:
//! - [`SqliteScoreStore`]: the production relational store (`sqlx`).
//! - [`InMemoryScoreStore`]: a lock-protected map for tests, benchmarks and demos.
//!
//! [`TimedScoreStore`] wraps either one and bounds every call with a timeout, so a
//! hung database surfaces as [`StoreError::Timeout`] instead of stalling a refresh.

mod memory;
mod sqlite;

pub use memory::InMemoryScoreStore;
pub use sqlite::SqliteScoreStore;

use crate::types::{ResponseId, SubscriberId, Vote};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Score store unavailable: {0}")]
    Unavailable(String),

    #[error("Score store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Score store query failed: {0}")]
    Database(String),

    #[error("Invalid row in score store: {0}")]
    InvalidRow(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err.to_string())
            }
            other => Self::Database(other.to_string()),
        }
    }
}

/// Store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `SQLite` connection URL (default: `sqlite://./db/hotboard.db`)
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Pool size (default: 5)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Upper bound on a single store call in milliseconds (default: 2000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_database_url() -> String {
    "sqlite://./db/hotboard.db".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_timeout_ms() -> u64 {
    2000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.database_url.starts_with("sqlite:") {
            return Err(format!("store.database_url must be a sqlite URL, got {}", self.database_url));
        }
        if self.max_connections == 0 {
            return Err("store.max_connections must be greater than 0".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("store.timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Read-only view of votes and responses.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Every vote recorded for `response_id`.
    async fn list_votes(&self, response_id: ResponseId) -> Result<Vec<Vote>, StoreError>;

    /// Creation time of the response, or `None` if it does not exist.
    async fn get_response_created_at(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Responses worth ranking in a full rebuild: those with at least one vote.
    async fn list_candidate_responses(&self) -> Result<Vec<ResponseId>, StoreError>;

    /// The response author, addressed by score-update notifications.
    async fn get_response_author(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<SubscriberId>, StoreError>;
}

/// Bounds every call of the wrapped store by `timeout`.
pub struct TimedScoreStore {
    inner: Arc<dyn ScoreStore>,
    timeout: Duration,
}

impl TimedScoreStore {
    #[must_use]
    pub fn new(inner: Arc<dyn ScoreStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>> + Send,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.timeout)))
    }
}

#[async_trait]
impl ScoreStore for TimedScoreStore {
    async fn list_votes(&self, response_id: ResponseId) -> Result<Vec<Vote>, StoreError> {
        self.bounded(self.inner.list_votes(response_id)).await
    }

    async fn get_response_created_at(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.bounded(self.inner.get_response_created_at(response_id)).await
    }

    async fn list_candidate_responses(&self) -> Result<Vec<ResponseId>, StoreError> {
        self.bounded(self.inner.list_candidate_responses()).await
    }

    async fn get_response_author(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<SubscriberId>, StoreError> {
        self.bounded(self.inner.get_response_author(response_id)).await
    }
}
