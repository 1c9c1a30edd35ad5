//! Integration tests for the hotboard core and server.
//!
//! This crate contains various test modules:
//!
//! - `vote_flow_tests`: Vote to aggregate to published ranking, with a fixed clock
//! - `failsafe_integration_tests`: Stale-but-available behaviour when the store or cache fails
//! - `snapshot_concurrency_tests`: Readers racing a publishing writer see whole lists only
//! - `notification_tests`: Hub delivery, failing connections and registry churn
//! - `runtime_tests`: Runtime builder, background workers and shutdown
//! - `http_api_tests`: Public and admin routers driven end to end
//! - `mock_infrastructure`: Failure-injecting store and cache plus shared fixtures
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! Everything runs in-process against the in-memory store and cache; no SQLite
//! file, Redis server or network listener is needed.

#[cfg(test)]
mod vote_flow_tests;

#[cfg(test)]
mod failsafe_integration_tests;


#[cfg(test)]
mod notification_tests;

#[cfg(test)]
mod runtime_tests;


/// Failure-injecting backends and fixtures
pub mod mock_infrastructure;
