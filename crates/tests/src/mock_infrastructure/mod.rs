//! Mock Infrastructure for Testing the Hotboard Core
//!
//! Backends that fail on demand, so the degradation paths can be driven without a
//! real database or Redis server.
//!
//! ## Components
//!
//! - `FlakyScoreStore`: In-memory store that can be switched to fail or hang
//! - `UnavailableRankCache`: Rank cache whose every call reports the backend down
//! - Test helpers for a fixed clock and a wired refresher/leaderboard pair
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{FlakyScoreStore, Harness};
//!
//! let store = Arc::new(FlakyScoreStore::new());
//! let harness = Harness::with_store(store.clone());
//! store.fail();
//! ```

pub mod failing_backends;
pub mod test_helpers;

pub use failing_backends::{FlakyScoreStore, StoreMode, UnavailableRankCache};
pub use test_helpers::*;
