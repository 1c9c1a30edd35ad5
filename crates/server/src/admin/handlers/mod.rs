//! Admin API handlers.

pub mod cache;
pub mod metrics;
pub mod notifications;
pub mod system;
