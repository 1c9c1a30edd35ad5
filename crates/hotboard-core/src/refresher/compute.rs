//! Store-backed aggregate and ranking computation shared by the refresher and the
//! uncached read path.

use super::RefreshError;
use crate::{
    scoring::ScoreEngine,
    store::ScoreStore,
    types::{RankingKind, ResponseAggregate, ResponseId},
};
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};

/// Recomputes one response's aggregate from its vote rows as of `now`.
pub async fn recompute_aggregate(
    engine: &ScoreEngine,
    store: &dyn ScoreStore,
    response_id: ResponseId,
    now: DateTime<Utc>,
) -> Result<ResponseAggregate, RefreshError> {
    let (created_at, votes) = tokio::try_join!(
        store.get_response_created_at(response_id),
        store.list_votes(response_id),
    )?;
    let created_at = created_at.ok_or(RefreshError::ResponseNotFound(response_id))?;
    Ok(engine.build_aggregate(response_id, &votes, created_at, now))
}

/// Both rankings computed from one consistent `now`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rankings {
    pub computed_at: DateTime<Utc>,
    /// Every candidate's fresh aggregate, in no particular order.
    pub aggregates: Vec<ResponseAggregate>,
    /// Hot ranking, at most `limit` entries.
    pub hot: Vec<ResponseId>,
    /// Most-voted ranking, at most `limit` entries.
    pub most_voted: Vec<ResponseId>,
}

impl Rankings {
    #[must_use]
    pub fn ids(&self, kind: RankingKind) -> &[ResponseId] {
        match kind {
            RankingKind::Hot => &self.hot,
            RankingKind::MostVoted => &self.most_voted,
        }
    }

    /// The aggregate of `response_id`, if it was a candidate.
    #[must_use]
    pub fn aggregate(&self, response_id: ResponseId) -> Option<&ResponseAggregate> {
        self.aggregates.iter().find(|a| a.response_id == response_id)
    }
}

/// Scans every candidate, recomputes its aggregate and sorts both rankings.
///
/// Candidates that disappear between the scan and the recomputation are skipped.
/// Any store failure fails the whole computation.
pub async fn compute_rankings(
    engine: &ScoreEngine,
    store: &dyn ScoreStore,
    limit: usize,
    concurrency: usize,
    now: DateTime<Utc>,
) -> Result<Rankings, RefreshError> {
    let candidates = store.list_candidate_responses().await?;

    let results: Vec<Result<ResponseAggregate, RefreshError>> = stream::iter(candidates)
        .map(|response_id| recompute_aggregate(engine, store, response_id, now))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut aggregates = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(aggregate) => aggregates.push(aggregate),
            Err(RefreshError::ResponseNotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    let mut by_hot: Vec<&ResponseAggregate> = aggregates.iter().collect();
    by_hot.sort_by(|a, b| ScoreEngine::compare(a, b));
    let hot = by_hot.iter().take(limit).map(|a| a.response_id).collect();

    let mut by_votes: Vec<&ResponseAggregate> = aggregates.iter().collect();
    by_votes.sort_by(|a, b| ScoreEngine::compare_most_voted(a, b));
    let most_voted = by_votes.iter().take(limit).map(|a| a.response_id).collect();

    Ok(Rankings { computed_at: now, aggregates, hot, most_voted })
}
