//! Scoring rules: vote aggregation, hot-score decay and ranking comparators.
//!
//! Everything here is pure apart from [`Clock`], which supplies the instant a
//! recomputation is anchored to.

mod clock;
mod engine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{AgeAnchor, ScoreEngine, ScoringConfig};
