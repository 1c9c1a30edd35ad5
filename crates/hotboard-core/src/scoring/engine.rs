//! Pure aggregate and hot-score computation.
//!
//! The hot score is a time-decayed popularity metric:
//!
//! ```text
//! hot = votes_count / (age_hours + age_offset_hours) ^ gravity
//! ```
//!
//! With the defaults (`age_offset_hours = 2`, `gravity = 1.8`) a response with three
//! votes scores `3 / 4^1.8 ≈ 0.247` two hours after its age anchor. The offset keeps the
//! denominator strictly positive, so the function never divides by zero.

use crate::types::{ResponseAggregate, ResponseId, Vote};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which instant a response's age is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeAnchor {
    /// Age counts from the response's creation time.
    #[default]
    ResponseCreated,
    /// Age counts from the most recent vote, falling back to creation time when
    /// the response has no votes.
    LastVote,
}

/// Hot-score tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Decay exponent (default: 1.8)
    #[serde(default = "default_gravity")]
    pub gravity: f64,

    /// Hours added to the age before decay (default: 2.0). Must be positive.
    #[serde(default = "default_age_offset_hours")]
    pub age_offset_hours: f64,

    /// Instant the age is measured from (default: response creation)
    #[serde(default)]
    pub age_anchor: AgeAnchor,
}

fn default_gravity() -> f64 {
    1.8
}
fn default_age_offset_hours() -> f64 {
    2.0
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            age_offset_hours: default_age_offset_hours(),
            age_anchor: AgeAnchor::default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.gravity.is_finite() || self.gravity < 0.0 {
            return Err(format!("scoring.gravity must be a finite non-negative number, got {}", self.gravity));
        }
        if !self.age_offset_hours.is_finite() || self.age_offset_hours <= 0.0 {
            return Err(format!(
                "scoring.age_offset_hours must be positive, got {}",
                self.age_offset_hours
            ));
        }
        Ok(())
    }
}

/// Side-effect-free scoring rules.
#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    config: ScoringConfig,
}

impl ScoreEngine {
    #[must_use]
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Returns `(score, votes_count)`: the sum of vote values and the number of votes.
    #[must_use]
    pub fn aggregate(votes: &[Vote]) -> (i64, u64) {
        votes.iter().fold((0_i64, 0_u64), |(score, count), vote| {
            (score + vote.value.delta(), count + 1)
        })
    }

    /// Time-decayed popularity of a response with `votes_count` votes.
    ///
    /// Ages below zero (an anchor in the future because of clock drift) count as zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hot_score(&self, votes_count: u64, anchor: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        if votes_count == 0 {
            return 0.0;
        }
        let age_hours = ((now - anchor).num_milliseconds() as f64 / 3_600_000.0).max(0.0);
        votes_count as f64 / (age_hours + self.config.age_offset_hours).powf(self.config.gravity)
    }

    /// Hot ranking order: descending hot score, lower response id first on ties.
    #[must_use]
    pub fn compare(a: &ResponseAggregate, b: &ResponseAggregate) -> Ordering {
        b.hot_score.total_cmp(&a.hot_score).then_with(|| a.response_id.cmp(&b.response_id))
    }

    /// Most-voted ranking order: descending vote count, lower response id first on ties.
    #[must_use]
    pub fn compare_most_voted(a: &ResponseAggregate, b: &ResponseAggregate) -> Ordering {
        b.votes_count.cmp(&a.votes_count).then_with(|| a.response_id.cmp(&b.response_id))
    }

    /// Builds the full aggregate for one response from its vote rows.
    #[must_use]
    pub fn build_aggregate(
        &self,
        response_id: ResponseId,
        votes: &[Vote],
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ResponseAggregate {
        let (score, votes_count) = Self::aggregate(votes);
        let anchor = match self.config.age_anchor {
            AgeAnchor::ResponseCreated => created_at,
            AgeAnchor::LastVote => {
                votes.iter().map(|v| v.created_at).max().unwrap_or(created_at)
            }
        };

        ResponseAggregate {
            response_id,
            score,
            votes_count,
            hot_score: self.hot_score(votes_count, anchor, now),
            computed_at: now,
        }
    }
}
