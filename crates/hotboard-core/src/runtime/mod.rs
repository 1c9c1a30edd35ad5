//! Runtime initialization and lifecycle management.
//!
//! Wires the score store, rank cache, notification hub, refresher and read path
//! from an [`AppConfig`](crate::config::AppConfig), starts the refresher workers and
//! coordinates graceful shutdown.
//!
//! # Example
//!
//! ```no_run
//! use hotboard_core::{config::AppConfig, runtime::HotboardRuntime};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let runtime = HotboardRuntime::builder().with_config(config).build().await?;
//!
//! let leaderboard = runtime.components().leaderboard.clone();
//! // ... serve reads ...
//!
//! runtime.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod components;
pub mod lifecycle;

pub use builder::{HotboardRuntimeBuilder, RuntimeError};
pub use components::HotboardComponents;
pub use lifecycle::HotboardRuntime;
