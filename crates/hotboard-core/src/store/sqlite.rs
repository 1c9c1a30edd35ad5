use super::{ScoreStore, StoreConfig, StoreError};
use crate::types::{ResponseId, SubscriberId, Vote, VoteValue, VoterId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use tracing::info;

/// Tables read by [`SqliteScoreStore`]. Owned and migrated by the gallery service;
/// exposed here so tests and local setups can create a compatible database.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS responses (
    id INTEGER PRIMARY KEY,
    author_id INTEGER,
    created_at TIMESTAMP NOT NULL
);
CREATE TABLE IF NOT EXISTS votes (
    id INTEGER PRIMARY KEY,
    response_id INTEGER NOT NULL REFERENCES responses(id),
    user_id INTEGER NOT NULL,
    value INTEGER NOT NULL,
    created_at TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_votes_response_id ON votes(response_id);
";

pub struct SqliteScoreStore {
    pool: SqlitePool,
}

impl SqliteScoreStore {
    /// # Errors
    /// Returns `StoreError::Unavailable` if the pool cannot connect.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.timeout())
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        info!(database_url = %config.database_url, "score store connected");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_vote(row: &sqlx::sqlite::SqliteRow) -> Result<Vote, StoreError> {
        let raw_value: i64 = row.try_get("value")?;
        let value = VoteValue::try_from(raw_value)
            .map_err(|e| StoreError::InvalidRow(format!("votes.value: {e}")))?;

        Ok(Vote {
            id: row.try_get("id")?,
            response_id: ResponseId(row.try_get("response_id")?),
            voter_id: VoterId(row.try_get("user_id")?),
            value,
            created_at: DateTime::from_naive_utc_and_offset(
                row.try_get::<NaiveDateTime, _>("created_at")?,
                Utc,
            ),
        })
    }
}

#[async_trait]
impl ScoreStore for SqliteScoreStore {
    async fn list_votes(&self, response_id: ResponseId) -> Result<Vec<Vote>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT id, response_id, user_id, value, created_at
            FROM votes
            WHERE response_id = ?
            ORDER BY id
            ",
        )
        .bind(response_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_vote).collect()
    }

    async fn get_response_created_at(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let created_at: Option<NaiveDateTime> =
            sqlx::query_scalar(r"SELECT created_at FROM responses WHERE id = ?")
                .bind(response_id.get())
                .fetch_optional(&self.pool)
                .await?;

        Ok(created_at.map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc)))
    }

    async fn list_candidate_responses(&self) -> Result<Vec<ResponseId>, StoreError> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r"
            SELECT r.id
            FROM responses r
            WHERE EXISTS (SELECT 1 FROM votes v WHERE v.response_id = r.id)
            ORDER BY r.id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(ResponseId).collect())
    }

    async fn get_response_author(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<SubscriberId>, StoreError> {
        let author: Option<Option<i64>> =
            sqlx::query_scalar(r"SELECT author_id FROM responses WHERE id = ?")
                .bind(response_id.get())
                .fetch_optional(&self.pool)
                .await?;

        Ok(author.flatten().map(SubscriberId))
    }
}
