//! Degradation tests: the store or the cache going away.
//!
//! These tests verify that:
//! - A refresh that cannot read the store leaves the cached aggregate untouched
//! - A rebuild that cannot read the store leaves the published rankings untouched
//! - Reads keep working from the cache while the store is down
//! - Reads fall back to the store while the cache is down, and votes still process
//! - A hanging store is cut off by the call timeout instead of stalling the refresher

use crate::mock_infrastructure::{
    seed_response, t0, upvotes, FlakyScoreStore, Harness, StoreMode, UnavailableRankCache,
};
use hotboard_core::{
    cache::{MemoryRankCache, RankCache},
    leaderboard::LeaderboardError,
    refresher::RefreshError,
    store::{StoreError, TimedScoreStore},
    types::{RankingKind, ResponseId, VoteValue, VoterId},
};
use std::{sync::Arc, time::Duration};

fn seeded_flaky_store() -> Arc<FlakyScoreStore> {
    let store = Arc::new(FlakyScoreStore::new());
    seed_response(store.data(), 1, t0(), None, &upvotes(3), t0());
    seed_response(store.data(), 2, t0(), None, &upvotes(1), t0());
    store
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_aggregate() {
    let store = seeded_flaky_store();
    let cache = Arc::new(MemoryRankCache::new(10));
    let harness = Harness::new(store.clone(), cache.clone());

    let before = harness.refresher.on_vote_recorded(ResponseId(1)).await.unwrap();
    assert_eq!(before.votes_count, 3);

    store.data().record_vote(ResponseId(1), VoterId(99), VoteValue::Up, t0());
    store.fail();

    let result = harness.refresher.on_vote_recorded(ResponseId(1)).await;
    assert!(matches!(result, Err(RefreshError::Store(StoreError::Unavailable(_)))));

    // Not an error, not cleared: the stale value is served.
    let served = harness.leaderboard.get_aggregate(ResponseId(1)).await.unwrap();
    assert_eq!(served, before);
    assert_eq!(cache.get_aggregate(ResponseId(1)).await.unwrap(), Some(before));
}

#[tokio::test]
async fn test_refresh_recovers_once_store_heals() {
    let store = seeded_flaky_store();
    let harness = Harness::new(store.clone(), Arc::new(MemoryRankCache::new(10)));

    store.fail();
    assert!(harness.refresher.on_vote_recorded(ResponseId(1)).await.is_err());

    store.heal();
    let aggregate = harness.refresher.on_vote_recorded(ResponseId(1)).await.unwrap();
    assert_eq!(aggregate.votes_count, 3);
}

#[tokio::test]
async fn test_failed_rebuild_keeps_published_lists() {
    let store = seeded_flaky_store();
    let cache = Arc::new(MemoryRankCache::new(10));
    let harness = Harness::new(store.clone(), cache.clone());

    harness.refresher.rebuild_top_list(5).await.unwrap();
    let published = cache.snapshot(RankingKind::Hot);
    assert_eq!(published.ids, vec![ResponseId(1), ResponseId(2)]);

    seed_response(store.data(), 3, t0(), None, &upvotes(10), t0());
    store.fail();
    assert!(harness.refresher.rebuild_top_list(5).await.is_err());

    assert_eq!(cache.snapshot(RankingKind::Hot), published);
    assert_eq!(cache.snapshot(RankingKind::MostVoted).version, 1);
}

#[tokio::test]
async fn test_reads_served_from_cache_while_store_down() {
    let store = seeded_flaky_store();
    let harness = Harness::new(store.clone(), Arc::new(MemoryRankCache::new(10)));
    harness.refresher.rebuild_top_list(5).await.unwrap();

    store.fail();
    let calls_before = store.calls();
    let rows = harness.leaderboard.get_top_responses(RankingKind::Hot, 5).await.unwrap();
    let ids: Vec<ResponseId> = rows.iter().map(|r| r.response_id).collect();
    assert_eq!(ids, vec![ResponseId(1), ResponseId(2)]);
    assert_eq!(store.calls(), calls_before);
}

#[tokio::test]
async fn test_cold_read_with_store_down_is_an_error() {
    let store = seeded_flaky_store();
    let harness = Harness::new(store.clone(), Arc::new(MemoryRankCache::new(10)));

    store.fail();
    let result = harness.leaderboard.get_top_responses(RankingKind::Hot, 5).await;
    assert!(matches!(result, Err(LeaderboardError::Store(_))));
}

#[tokio::test]
async fn test_cache_down_reads_compute_from_store() {
    let store = seeded_flaky_store();
    let cache = Arc::new(UnavailableRankCache::new());
    let harness = Harness::new(store, cache.clone());

    let rows = harness.leaderboard.get_top_responses(RankingKind::MostVoted, 5).await.unwrap();
    let ids: Vec<ResponseId> = rows.iter().map(|r| r.response_id).collect();
    assert_eq!(ids, vec![ResponseId(1), ResponseId(2)]);

    let aggregate = harness.leaderboard.get_aggregate(ResponseId(2)).await.unwrap();
    assert_eq!((aggregate.score, aggregate.votes_count), (1, 1));
    assert!(cache.calls() >= 2);
}

#[tokio::test]
async fn test_cache_down_votes_still_process() {
    let store = seeded_flaky_store();
    let harness = Harness::new(store, Arc::new(UnavailableRankCache::new()));

    // Writes are dropped with a log entry; the caller still gets the fresh aggregate.
    let aggregate = harness.refresher.on_vote_recorded(ResponseId(1)).await.unwrap();
    assert_eq!(aggregate.votes_count, 3);

    let rankings = harness.refresher.rebuild_top_list(5).await.unwrap();
    assert_eq!(rankings.hot.len(), 2);
}

#[tokio::test]
async fn test_cache_and_store_down_fails_cleanly() {
    let store = seeded_flaky_store();
    let harness = Harness::new(store.clone(), Arc::new(UnavailableRankCache::new()));

    store.fail();
    let result = harness.leaderboard.get_aggregate(ResponseId(1)).await;
    assert!(matches!(result, Err(LeaderboardError::Store(StoreError::Unavailable(_)))));
}

#[tokio::test]
async fn test_hanging_store_is_timed_out() {
    let store = seeded_flaky_store();
    let timed = Arc::new(TimedScoreStore::new(store.clone(), Duration::from_millis(50)));
    let cache = Arc::new(MemoryRankCache::new(10));
    let harness = Harness::new(timed, cache.clone());

    store.set_mode(StoreMode::Hanging);
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        harness.refresher.on_vote_recorded(ResponseId(1)),
    )
    .await
    .expect("refresh should be bounded by the store timeout");

    assert!(matches!(result, Err(RefreshError::Store(StoreError::Timeout(_)))));
    assert_eq!(cache.get_aggregate(ResponseId(1)).await.unwrap(), None);
}
