//! HTTP surface of the hotboard gallery.
//!
//! - [`router`]: public gallery reads, the vote trigger and health.
//! - [`ws`]: per-subscriber WebSocket push channel.
//! - [`admin`]: token-gated maintenance API on its own listener.
//! - [`middleware`]: request correlation ids.

pub mod admin;
pub mod middleware;
pub mod router;
pub mod ws;
