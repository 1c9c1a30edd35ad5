//! Test Helper Functions and Utilities
//!
//! A fixed clock plus a [`Harness`] that wires a refresher and a leaderboard the way
//! the runtime builder does, but over caller-supplied backends.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hotboard_core::{
    cache::RankCache,
    leaderboard::Leaderboard,
    metrics::MetricsCollector,
    notify::{NotificationConfig, NotificationHub},
    refresher::{RankRefresher, RefresherConfig, RefresherDeps, RefresherOptions},
    scoring::{Clock, ManualClock, ScoreEngine, ScoringConfig},
    store::{InMemoryScoreStore, ScoreStore},
    types::{ResponseId, SubscriberId, VoteValue, VoterId},
};
use std::sync::Arc;

/// Fixed reference instant all scenarios are anchored on.
#[must_use]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().unwrap_or_default()
}

/// `t0()` shifted by `hours`.
#[must_use]
pub fn at_hours(hours: i64) -> DateTime<Utc> {
    t0() + Duration::hours(hours)
}

/// Inserts a response created at `created_at` and records `votes` at `voted_at`,
/// one distinct voter per vote.
pub fn seed_response(
    store: &InMemoryScoreStore,
    id: i64,
    created_at: DateTime<Utc>,
    author: Option<SubscriberId>,
    votes: &[VoteValue],
    voted_at: DateTime<Utc>,
) -> ResponseId {
    let response_id = ResponseId(id);
    store.insert_response(response_id, created_at, author);
    for (voter, value) in (0_i64..).zip(votes) {
        store.record_vote(response_id, VoterId(voter), *value, voted_at);
    }
    response_id
}

/// `n` upvotes.
#[must_use]
pub fn upvotes(n: usize) -> Vec<VoteValue> {
    vec![VoteValue::Up; n]
}

/// Knobs for [`Harness::build`].
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub scoring: ScoringConfig,
    pub top_n: usize,
    pub notifications: NotificationConfig,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            top_n: 5,
            notifications: NotificationConfig { send_timeout_ms: 50, ..NotificationConfig::default() },
        }
    }
}

/// Refresher, leaderboard and hub sharing one store, cache and clock.
///
/// The refresher rebuilds inline (`debounce_ms = 0`) and no workers are started, so
/// every effect of a call is visible once it returns.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub metrics: Arc<MetricsCollector>,
    pub hub: Arc<NotificationHub>,
    pub refresher: Arc<RankRefresher>,
    pub leaderboard: Leaderboard,
}

impl Harness {
    #[must_use]
    pub fn build(
        store: Arc<dyn ScoreStore>,
        cache: Arc<dyn RankCache>,
        options: HarnessOptions,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let metrics = Arc::new(MetricsCollector::new());
        let hub = Arc::new(NotificationHub::new(&options.notifications, Arc::clone(&metrics)));
        let engine = ScoreEngine::new(options.scoring);

        let refresher = Arc::new(RankRefresher::new(
            RefresherDeps {
                engine: engine.clone(),
                store: Arc::clone(&store),
                cache: Arc::clone(&cache),
                hub: Arc::clone(&hub),
                clock: Arc::clone(&dyn_clock),
                metrics: Arc::clone(&metrics),
            },
            RefresherOptions {
                config: RefresherConfig { debounce_ms: 0, ..RefresherConfig::default() },
                top_n: options.top_n,
                notify_authors: options.notifications.notify_authors,
                broadcast_rankings: options.notifications.broadcast_rankings,
            },
        ));
        let leaderboard = Leaderboard::new(
            engine,
            store,
            cache,
            Arc::clone(&refresher),
            dyn_clock,
            Arc::clone(&metrics),
        );

        Self { clock, metrics, hub, refresher, leaderboard }
    }

    #[must_use]
    pub fn new(store: Arc<dyn ScoreStore>, cache: Arc<dyn RankCache>) -> Self {
        Self::build(store, cache, HarnessOptions::default())
    }
}
