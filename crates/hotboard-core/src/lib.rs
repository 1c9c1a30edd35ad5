//! # Hotboard Core
//!
//! Core library for the hotboard gallery: vote aggregation, time-decayed ranking,
//! a cache of published rankings and live push notifications.
//!
//! - **[`scoring`]**: Pure scoring rules. Vote totals, the hot-score decay and the
//!   ranking comparators.
//!
//! - **[`store`]**: Read-only access to the responses and votes owned by the voting
//!   service, with a `SQLite` backend.
//!
//! - **[`cache`]**: Per-response aggregates and atomically swapped ranking snapshots,
//!   in memory or in Redis.
//!
//! - **[`refresher`]**: Recomputes aggregates after votes and rebuilds the rankings,
//!   debounced and on an interval.
//!
//! - **[`leaderboard`]**: The read path, with fallback to the store when the cache is
//!   unreachable.
//!
//! - **[`notify`]**: Registry of live subscriber connections and push delivery.
//!
//! - **[`runtime`]**: Wires everything from [`config::AppConfig`] and manages shutdown.
//!
//! ## Vote Flow
//!
//! ```text
//! vote recorded (voting service)
//!       │
//!       ▼
//! ┌──────────────┐  queue full  ┌────────────────┐
//! │ RankRefresher│ ───────────► │ rebuild worker │
//! │ (vote worker)│              │ (debounced)    │
//! └──────┬───────┘              └───────┬────────┘
//!        │ recompute aggregate          │ rank every candidate
//!        ▼                              ▼
//! ┌──────────────┐              ┌────────────────┐
//! │  RankCache   │ ◄─────────── │ publish TopList│
//! └──────┬───────┘              └───────┬────────┘
//!        │                              │ order changed
//!        ▼                              ▼
//!  score_updated ──► NotificationHub ◄── top_list_changed
//! ```

pub mod cache;
pub mod config;
pub mod leaderboard;
pub mod metrics;
pub mod notify;
pub mod refresher;
pub mod runtime;
pub mod scoring;
pub mod store;
pub mod types;
