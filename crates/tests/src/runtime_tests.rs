//! Integration tests for the runtime builder and its background workers.
//!
//! These tests verify the behavioral contracts of the hotboard runtime:
//! - Builder validation catches configuration errors before anything connects
//! - Queued vote events are processed by the workers and published after the debounce
//! - The periodic rebuild publishes without any vote event
//! - A full vote queue drops the event instead of blocking the caller
//! - Shutdown stops the workers and closes every live connection
//!
//! Tests use `tokio::time::timeout` around polling loops so a regression fails
//! instead of hanging.

use crate::mock_infrastructure::{seed_response, t0, upvotes};
use hotboard_core::{
    cache::{MemoryRankCache, RankCache},
    config::AppConfig,
    notify::{Connection, Payload},
    runtime::{HotboardRuntime, HotboardRuntimeBuilder, RuntimeError},
    scoring::ManualClock,
    store::InMemoryScoreStore,
    types::{RankingKind, ResponseId, SubscriberId},
};
use std::{sync::Arc, time::Duration};
use tokio::time::{sleep, timeout};

/// Fast workers: 20 ms debounce, periodic rebuild off.
fn create_test_runtime_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.refresher.debounce_ms = 20;
    config.refresher.rebuild_interval_seconds = 0;
    config.notifications.send_timeout_ms = 100;
    config
}

async fn build_runtime(
    config: AppConfig,
    store: Arc<InMemoryScoreStore>,
    cache: Arc<MemoryRankCache>,
) -> HotboardRuntime {
    HotboardRuntimeBuilder::new()
        .with_config(config)
        .with_store(store)
        .with_cache(cache)
        .with_clock(Arc::new(ManualClock::new(t0())))
        .build()
        .await
        .expect("runtime should build with in-memory backends")
}

/// Polls until the `kind` ranking is published with `expected`.
async fn wait_for_ranking(cache: &MemoryRankCache, kind: RankingKind, expected: &[ResponseId]) {
    timeout(Duration::from_secs(3), async {
        loop {
            if cache.snapshot(kind).ids == expected {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{kind} ranking never became {expected:?}"));
}

#[tokio::test]
async fn test_builder_rejects_top_n_above_cache_capacity() {
    let mut config = create_test_runtime_config();
    config.ranking.top_n = 50;
    config.cache.max_list_len = 10;

    let result = HotboardRuntime::builder()
        .with_config(config)
        .with_store(Arc::new(InMemoryScoreStore::new()))
        .without_workers()
        .build()
        .await;
    assert!(matches!(result, Err(RuntimeError::ConfigValidation(_))));
}

#[tokio::test]
async fn test_queued_vote_is_processed_and_published() {
    let store = Arc::new(InMemoryScoreStore::new());
    let cache = Arc::new(MemoryRankCache::new(100));
    let response = seed_response(&store, 1, t0(), None, &upvotes(2), t0());
    let runtime = build_runtime(create_test_runtime_config(), store, cache.clone()).await;

    assert!(runtime.components().refresher.notify_vote_recorded(response));
    wait_for_ranking(&cache, RankingKind::Hot, &[response]).await;

    let aggregate = cache.get_aggregate(response).await.unwrap().unwrap();
    assert_eq!(aggregate.votes_count, 2);
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_author_notified_through_workers() {
    let store = Arc::new(InMemoryScoreStore::new());
    let cache = Arc::new(MemoryRankCache::new(100));
    let response = seed_response(&store, 3, t0(), Some(SubscriberId(9)), &upvotes(1), t0());
    let runtime = build_runtime(create_test_runtime_config(), store, cache).await;

    let hub = Arc::clone(&runtime.components().hub);
    let (connection, mut rx) = Connection::new(SubscriberId(9), hub.channel_capacity());
    hub.register(connection).unwrap();

    runtime.components().refresher.notify_vote_recorded(response);
    let score_update = timeout(Duration::from_secs(3), async {
        while let Some(payload) = rx.recv().await {
            let Payload::Text(text) = payload else { continue };
            let message: serde_json::Value = serde_json::from_str(&text).unwrap();
            if message["type"] == "score_updated" {
                return message;
            }
        }
        panic!("connection closed before a score update arrived");
    })
    .await
    .expect("score update should arrive");

    assert_eq!(score_update["response_id"], 3);
    assert_eq!(score_update["votes_count"], 1);
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_periodic_rebuild_publishes_without_votes() {
    let store = Arc::new(InMemoryScoreStore::new());
    let cache = Arc::new(MemoryRankCache::new(100));
    seed_response(&store, 1, t0(), None, &upvotes(1), t0());
    seed_response(&store, 2, t0(), None, &upvotes(4), t0());

    let mut config = create_test_runtime_config();
    config.refresher.rebuild_interval_seconds = 1;
    let runtime = build_runtime(config, store, cache.clone()).await;

    // The first interval tick fires immediately, so startup publishes right away.
    wait_for_ranking(&cache, RankingKind::MostVoted, &[ResponseId(2), ResponseId(1)]).await;
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_full_vote_queue_drops_instead_of_blocking() {
    let mut config = create_test_runtime_config();
    config.refresher.queue_capacity = 1;
    let runtime = HotboardRuntimeBuilder::new()
        .with_config(config)
        .with_store(Arc::new(InMemoryScoreStore::new()))
        .without_workers()
        .build()
        .await
        .unwrap();

    let refresher = &runtime.components().refresher;
    assert!(refresher.notify_vote_recorded(ResponseId(1)));
    assert!(!refresher.notify_vote_recorded(ResponseId(2)));
}

#[tokio::test]
async fn test_shutdown_stops_workers_and_closes_connections() {
    let store = Arc::new(InMemoryScoreStore::new());
    let runtime =
        build_runtime(create_test_runtime_config(), store, Arc::new(MemoryRankCache::new(100))).await;
    let components = runtime.components().clone();

    let (connection, _rx) = Connection::new(SubscriberId(1), 8);
    components.hub.register(Arc::clone(&connection)).unwrap();
    let mut shutdown_rx = runtime.shutdown_receiver();

    timeout(Duration::from_secs(10), runtime.shutdown())
        .await
        .expect("shutdown should finish within the worker timeout");

    assert!(shutdown_rx.try_recv().is_ok());
    assert!(!connection.is_open());
    assert_eq!(components.hub.connection_count(), 0);
    // The vote worker is gone, so new events are dropped.
    assert!(!components.refresher.notify_vote_recorded(ResponseId(1)));
}
