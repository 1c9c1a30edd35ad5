//! Vote to aggregate to published ranking, end to end on a fixed clock.
//!
//! These tests verify that:
//! - A processed vote produces the exact aggregate and hot score for the configured anchor
//! - A rebuild publishes the candidate set in hot order and bumps the list version
//! - Gallery reads agree with what the refresher published
//! - Time passing reorders the hot ranking but not the most-voted one

use crate::mock_infrastructure::{at_hours, seed_response, t0, upvotes, Harness, HarnessOptions};
use hotboard_core::{
    cache::{MemoryRankCache, RankCache},
    scoring::{AgeAnchor, ScoringConfig},
    store::InMemoryScoreStore,
    types::{RankingKind, ResponseId, VoteValue},
};
use std::sync::Arc;

fn last_vote_options() -> HarnessOptions {
    HarnessOptions {
        scoring: ScoringConfig { age_anchor: AgeAnchor::LastVote, ..ScoringConfig::default() },
        ..HarnessOptions::default()
    }
}

#[tokio::test]
async fn test_three_votes_two_hours_after_last_vote() {
    let store = Arc::new(InMemoryScoreStore::new());
    let cache = Arc::new(MemoryRankCache::new(10));
    let response = seed_response(
        &store,
        1,
        t0(),
        None,
        &[VoteValue::Up, VoteValue::Up, VoteValue::Down],
        at_hours(1),
    );
    let harness = Harness::build(store, cache.clone(), last_vote_options());
    harness.clock.set(at_hours(3));

    let aggregate = harness.refresher.on_vote_recorded(response).await.unwrap();
    assert_eq!(aggregate.score, 1);
    assert_eq!(aggregate.votes_count, 3);
    // 3 / (2 + 2)^1.8
    assert!((aggregate.hot_score - 0.2474).abs() < 1e-4);
    assert_eq!(aggregate.computed_at, at_hours(3));

    let rankings = harness.refresher.rebuild_top_list(1).await.unwrap();
    assert_eq!(rankings.hot, vec![response]);
    assert_eq!(rankings.most_voted, vec![response]);
    assert_eq!(cache.snapshot(RankingKind::Hot).ids, vec![response]);
}

#[tokio::test]
async fn test_creation_anchor_counts_age_from_creation() {
    let store = Arc::new(InMemoryScoreStore::new());
    let response = seed_response(
        &store,
        1,
        t0(),
        None,
        &[VoteValue::Up, VoteValue::Up, VoteValue::Down],
        at_hours(1),
    );
    let harness = Harness::new(store, Arc::new(MemoryRankCache::new(10)));
    harness.clock.set(at_hours(3));

    let aggregate = harness.refresher.on_vote_recorded(response).await.unwrap();
    // 3 / (3 + 2)^1.8
    assert!((aggregate.hot_score - 0.1656).abs() < 1e-4);
}

#[tokio::test]
async fn test_rebuild_publishes_hot_order_and_versions() {
    let store = Arc::new(InMemoryScoreStore::new());
    let cache = Arc::new(MemoryRankCache::new(10));
    // Old and popular, fresh and modest, and two equal fresh ones to exercise the id tie-break.
    seed_response(&store, 10, at_hours(-48), None, &upvotes(9), at_hours(-48));
    seed_response(&store, 20, t0(), None, &upvotes(3), t0());
    seed_response(&store, 31, t0(), None, &upvotes(2), t0());
    seed_response(&store, 30, t0(), None, &upvotes(2), t0());
    let harness = Harness::new(store, cache.clone());
    harness.clock.set(at_hours(1));

    harness.refresher.rebuild_top_list(5).await.unwrap();
    let hot = cache.snapshot(RankingKind::Hot);
    assert_eq!(hot.version, 1);
    assert_eq!(hot.ids, vec![ResponseId(20), ResponseId(30), ResponseId(31), ResponseId(10)]);
    let most_voted = cache.snapshot(RankingKind::MostVoted);
    assert_eq!(most_voted.ids, vec![ResponseId(10), ResponseId(20), ResponseId(30), ResponseId(31)]);

    harness.refresher.rebuild_top_list(5).await.unwrap();
    assert_eq!(cache.snapshot(RankingKind::Hot).version, 2);
}

#[tokio::test]
async fn test_rebuild_writes_fresh_aggregates_back() {
    let store = Arc::new(InMemoryScoreStore::new());
    let cache = Arc::new(MemoryRankCache::new(10));
    let response = seed_response(&store, 7, t0(), None, &upvotes(4), t0());
    let harness = Harness::new(store, cache.clone());

    harness.refresher.rebuild_top_list(5).await.unwrap();
    let cached = cache.get_aggregate(response).await.unwrap().unwrap();
    assert_eq!(cached.votes_count, 4);
    assert_eq!(cached.computed_at, t0());
}

#[tokio::test]
async fn test_gallery_reads_match_published_ranking() {
    let store = Arc::new(InMemoryScoreStore::new());
    for id in 1..=4 {
        seed_response(&store, id, t0(), None, &upvotes(usize::try_from(id).unwrap()), t0());
    }
    let harness = Harness::new(store, Arc::new(MemoryRankCache::new(10)));
    let rankings = harness.refresher.rebuild_top_list(5).await.unwrap();

    let rows = harness.leaderboard.get_top_responses(RankingKind::Hot, 3).await.unwrap();
    let ids: Vec<ResponseId> = rows.iter().map(|r| r.response_id).collect();
    assert_eq!(ids, rankings.hot[..3].to_vec());
    assert_eq!(rows[0].votes_count, 4);
    assert!(rows.windows(2).all(|w| w[0].hot_score >= w[1].hot_score));
}

#[tokio::test]
async fn test_time_passing_reorders_hot_only() {
    let store = Arc::new(InMemoryScoreStore::new());
    let cache = Arc::new(MemoryRankCache::new(10));
    seed_response(&store, 1, t0(), None, &upvotes(10), t0());
    let harness = Harness::new(store.clone(), cache.clone());
    harness.refresher.rebuild_top_list(5).await.unwrap();

    // A late newcomer with fewer votes overtakes on hot once the first one has aged.
    harness.clock.set(at_hours(24));
    seed_response(&store, 2, at_hours(24), None, &upvotes(2), at_hours(24));
    harness.refresher.rebuild_top_list(5).await.unwrap();

    assert_eq!(cache.snapshot(RankingKind::Hot).ids, vec![ResponseId(2), ResponseId(1)]);
    assert_eq!(cache.snapshot(RankingKind::MostVoted).ids, vec![ResponseId(1), ResponseId(2)]);
}

#[tokio::test]
async fn test_rebuild_limit_truncates_published_list() {
    let store = Arc::new(InMemoryScoreStore::new());
    for id in 1..=6 {
        seed_response(&store, id, t0(), None, &upvotes(1), t0());
    }
    let cache = Arc::new(MemoryRankCache::new(10));
    let harness = Harness::new(store, cache.clone());

    harness.refresher.rebuild_top_list(2).await.unwrap();
    assert_eq!(cache.snapshot(RankingKind::Hot).ids, vec![ResponseId(1), ResponseId(2)]);
}
