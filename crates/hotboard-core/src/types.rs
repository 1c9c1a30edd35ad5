//! Core type definitions shared by scoring, caching, refreshing and notification.
//!
//! # Type Categories
//!
//! ## Identifiers
//! - [`ResponseId`], [`VoterId`], [`SubscriberId`]: transparent `i64` newtypes matching the
//!   relational store's integer primary keys.
//!
//! ## Vote Data
//! - [`Vote`], [`VoteValue`]: immutable rows read from the score store.
//!
//! ## Derived Data
//! - [`ResponseAggregate`]: per-response summary, rebuildable from the store at any time.
//! - [`TopList`]: an immutable published ranking snapshot.
//! - [`RankingKind`]: the two named rankings maintained side by side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a gallery response (the thing being voted on).
    ResponseId
);
id_newtype!(
    /// Identifier of the user who cast a vote.
    VoterId
);
id_newtype!(
    /// Identity that may hold live client connections for push delivery.
    SubscriberId
);

/// Direction of a single vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    /// Signed contribution of this vote to a response's score.
    #[must_use]
    pub const fn delta(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

/// A stored vote value outside `{-1, +1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("vote value must be -1 or 1, got {0}")]
pub struct InvalidVoteValue(pub i64);

impl TryFrom<i64> for VoteValue {
    type Error = InvalidVoteValue;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            other => Err(InvalidVoteValue(other)),
        }
    }
}

impl From<VoteValue> for i64 {
    fn from(value: VoteValue) -> Self {
        value.delta()
    }
}

/// A single vote row. Created once per (voter, response) upstream and never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub response_id: ResponseId,
    pub voter_id: VoterId,
    pub value: VoteValue,
    pub created_at: DateTime<Utc>,
}

/// Derived per-response vote summary.
///
/// `score` and `votes_count` reflect the vote rows seen at the last recomputation;
/// `hot_score` is a pure function of `votes_count` and the response's age at `computed_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAggregate {
    pub response_id: ResponseId,
    pub score: i64,
    pub votes_count: u64,
    pub hot_score: f64,
    pub computed_at: DateTime<Utc>,
}

/// The two rankings published by the refresher.
///
/// `Hot` (time-decayed) is the default gallery source. `MostVoted` ranks by raw
/// vote count and is exposed as an alternative view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingKind {
    #[default]
    Hot,
    MostVoted,
}

impl RankingKind {
    pub const ALL: [Self; 2] = [Self::Hot, Self::MostVoted];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::MostVoted => "most_voted",
        }
    }
}

impl fmt::Display for RankingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(Self::Hot),
            "most_voted" | "most-voted" => Ok(Self::MostVoted),
            other => Err(format!("unknown ranking '{other}', expected 'hot' or 'most_voted'")),
        }
    }
}

/// An immutable, fully built ranking snapshot.
///
/// Published lists are swapped wholesale; a reader holds either the previous
/// snapshot or the new one, never a mix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopList {
    pub kind: RankingKind,
    /// Monotonic publish counter. `0` means nothing has been published yet.
    pub version: u64,
    pub ids: Vec<ResponseId>,
    pub published_at: Option<DateTime<Utc>>,
}

impl TopList {
    /// The list a reader sees before the first publish.
    #[must_use]
    pub fn unpublished(kind: RankingKind) -> Self {
        Self { kind, version: 0, ids: Vec::new(), published_at: None }
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        self.version > 0
    }
}

/// One row of the gallery read API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResponse {
    pub response_id: ResponseId,
    pub score: i64,
    pub votes_count: u64,
    pub hot_score: f64,
}

impl From<&ResponseAggregate> for RankedResponse {
    fn from(aggregate: &ResponseAggregate) -> Self {
        Self {
            response_id: aggregate.response_id,
            score: aggregate.score,
            votes_count: aggregate.votes_count,
            hot_score: aggregate.hot_score,
        }
    }
}
