use super::{CacheError, CacheStats, MaintenanceGrant, RankCache, RankCacheConfig};
use crate::types::{RankingKind, ResponseAggregate, ResponseId, TopList};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client, Script,
};
use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{debug, info};

const SCAN_BATCH: usize = 500;

/// Allocates the next version and stores the snapshot spliced around it in one
/// server-side step, so the stored list never carries an older version than the
/// counter. `ARGV[1]` and `ARGV[2]` are the JSON before and after the version.
const PUBLISH_SCRIPT: &str = r"
local version = redis.call('INCR', KEYS[2])
redis.call('SET', KEYS[1], ARGV[1] .. version .. ARGV[2])
return version
";

/// Redis-backed rank cache shared by every server instance.
///
/// Key layout under `{prefix}`:
///
/// | key | type | contents |
/// |-----|------|----------|
/// | `{prefix}:response:{id}` | hash | `score`, `votes_count`, `hot_score`, `computed_at` |
/// | `{prefix}:top:{kind}` | string | JSON-encoded [`TopList`] snapshot |
/// | `{prefix}:top:{kind}:version` | integer | publish counter |
///
/// A ranking is published by a Lua script that increments the version counter and
/// `SET`s the whole snapshot together. Instances sharing the database therefore
/// never leave a list behind a newer version.
pub struct RedisRankCache {
    conn: ConnectionManager,
    publish: Script,
    prefix: String,
    max_list_len: usize,
    timeout: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RedisRankCache {
    /// Connects to the configured Redis URL.
    pub async fn connect(config: &RankCacheConfig) -> Result<Self, CacheError> {
        let url = config
            .redis_url
            .as_deref()
            .ok_or_else(|| CacheError::Unavailable("no redis_url configured".to_string()))?;

        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(config.timeout());

        let client = Client::open(url)?;
        let conn = tokio::time::timeout(
            config.timeout() * 4,
            client.get_connection_manager_with_config(manager_config),
        )
        .await
        .map_err(|_| CacheError::Timeout(config.timeout() * 4))??;

        info!(prefix = %config.key_prefix, "redis rank cache connected");

        Ok(Self {
            conn,
            publish: Script::new(PUBLISH_SCRIPT),
            prefix: config.key_prefix.clone(),
            max_list_len: config.max_list_len.max(1),
            timeout: config.timeout(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    fn aggregate_key(&self, response_id: ResponseId) -> String {
        format!("{}:response:{response_id}", self.prefix)
    }

    fn top_key(&self, kind: RankingKind) -> String {
        format!("{}:top:{kind}", self.prefix)
    }

    fn version_key(&self, kind: RankingKind) -> String {
        format!("{}:top:{kind}:version", self.prefix)
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }

    /// Collects every key matching `pattern` with cursor-based `SCAN`.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = self
                .bounded(
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn),
                )
                .await?;
            keys.extend(batch);
            if next == 0 {
                return Ok(keys);
            }
            cursor = next;
        }
    }
}

fn parse_field<T: std::str::FromStr>(
    fields: &HashMap<String, String>,
    name: &str,
) -> Result<T, CacheError> {
    fields
        .get(name)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| CacheError::Serialization(format!("missing or invalid field '{name}'")))
}

fn decode_aggregate(
    response_id: ResponseId,
    fields: &HashMap<String, String>,
) -> Result<ResponseAggregate, CacheError> {
    let computed_at: String = parse_field(fields, "computed_at")?;
    let computed_at = DateTime::parse_from_rfc3339(&computed_at)
        .map_err(|e| CacheError::Serialization(format!("computed_at: {e}")))?
        .with_timezone(&Utc);

    Ok(ResponseAggregate {
        response_id,
        score: parse_field(fields, "score")?,
        votes_count: parse_field(fields, "votes_count")?,
        hot_score: parse_field(fields, "hot_score")?,
        computed_at,
    })
}

/// JSON encoding of a [`TopList`] split around its `version` value.
fn snapshot_template(
    kind: RankingKind,
    ids: &[ResponseId],
    published_at: DateTime<Utc>,
) -> Result<(String, String), CacheError> {
    let head = format!(r#"{{"kind":{},"version":"#, serde_json::to_string(&kind)?);
    let tail = format!(
        r#","ids":{},"published_at":{}}}"#,
        serde_json::to_string(ids)?,
        serde_json::to_string(&published_at)?
    );
    Ok((head, tail))
}

#[async_trait]
impl RankCache for RedisRankCache {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get_aggregate(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<ResponseAggregate>, CacheError> {
        let mut conn = self.conn.clone();
        let key = self.aggregate_key(response_id);
        let fields: HashMap<String, String> = self.bounded(conn.hgetall(&key)).await?;

        if fields.is_empty() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        decode_aggregate(response_id, &fields).map(Some)
    }

    async fn set_aggregate(&self, aggregate: &ResponseAggregate) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let key = self.aggregate_key(aggregate.response_id);
        let fields = [
            ("score", aggregate.score.to_string()),
            ("votes_count", aggregate.votes_count.to_string()),
            ("hot_score", aggregate.hot_score.to_string()),
            ("computed_at", aggregate.computed_at.to_rfc3339()),
        ];
        self.bounded(conn.hset_multiple::<_, _, _, ()>(&key, &fields)).await
    }

    async fn replace_top_list(
        &self,
        kind: RankingKind,
        mut ids: Vec<ResponseId>,
    ) -> Result<Arc<TopList>, CacheError> {
        ids.truncate(self.max_list_len);
        let mut conn = self.conn.clone();

        let published_at = Utc::now();
        let (head, tail) = snapshot_template(kind, &ids, published_at)?;
        let mut invocation = self.publish.prepare_invoke();
        invocation.key(self.top_key(kind)).key(self.version_key(kind)).arg(head).arg(tail);
        let version: u64 = self.bounded(invocation.invoke_async(&mut conn)).await?;
        let snapshot = TopList { kind, version, ids, published_at: Some(published_at) };

        debug!(
            ranking = %kind,
            version,
            entries = snapshot.ids.len(),
            "top list published to redis"
        );
        Ok(Arc::new(snapshot))
    }

    async fn get_top_list(&self, kind: RankingKind) -> Result<Arc<TopList>, CacheError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = self.bounded(conn.get(self.top_key(kind))).await?;
        match payload {
            Some(raw) => Ok(Arc::new(serde_json::from_str(&raw)?)),
            None => Ok(Arc::new(TopList::unpublished(kind))),
        }
    }

    async fn flush(&self, _grant: &MaintenanceGrant) -> Result<(), CacheError> {
        // Only keys under our prefix; the database may be shared.
        let keys = self.scan_keys(&format!("{}:*", self.prefix)).await?;
        let mut conn = self.conn.clone();
        for chunk in keys.chunks(SCAN_BATCH) {
            self.bounded(conn.del::<_, ()>(chunk)).await?;
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        info!(deleted = keys.len(), prefix = %self.prefix, "redis rank cache flushed");
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let aggregates = self.scan_keys(&format!("{}:response:*", self.prefix)).await?;
        let hot = self.get_top_list(RankingKind::Hot).await?;
        let most_voted = self.get_top_list(RankingKind::MostVoted).await?;
        Ok(CacheStats {
            backend: self.backend().to_string(),
            aggregate_entries: aggregates.len() as u64,
            hot_list_len: hot.ids.len(),
            hot_list_version: hot.version,
            most_voted_list_len: most_voted.ids.len(),
            most_voted_list_version: most_voted.version,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }
}
