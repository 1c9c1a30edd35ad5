//! Live connection registry and push delivery.
//!
//! ```text
//!   socket task ──register──►  NotificationHub  ◄──send_to / broadcast── refresher
//!        ▲                     SubscriberId ─► [Arc<Connection>, ...]
//!        │                              │
//!        └──── mpsc<Payload> ◄──────────┘
//! ```
//!
//! A subscriber may hold several connections (tabs, devices). A connection that
//! fails a send (closed peer, full queue past the send timeout) is unregistered on
//! the spot; callers only see a [`DeliveryReport`].

mod connection;
mod hub;

pub use connection::{Connection, ConnectionError, ConnectionState, Payload};
pub use hub::{DeliveryReport, HubStats, NotificationHub};

use crate::types::{RankingKind, ResponseAggregate, ResponseId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Per-connection send bound in milliseconds (default: 1000)
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Outbound queue length per connection (default: 64)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Push `score_updated` to the response author after each vote (default: true)
    #[serde(default = "default_true")]
    pub notify_authors: bool,

    /// Broadcast `top_list_changed` when a ranking's order changes (default: true)
    #[serde(default = "default_true")]
    pub broadcast_rankings: bool,
}

fn default_send_timeout_ms() -> u64 {
    1000
}
fn default_channel_capacity() -> usize {
    64
}
fn default_true() -> bool {
    true
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: default_send_timeout_ms(),
            channel_capacity: default_channel_capacity(),
            notify_authors: true,
            broadcast_rankings: true,
        }
    }
}

impl NotificationConfig {
    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.send_timeout_ms == 0 {
            return Err("notifications.send_timeout_ms must be greater than 0".to_string());
        }
        if self.channel_capacity == 0 {
            return Err("notifications.channel_capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Messages pushed by the refresher, serialized as tagged JSON text frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    ScoreUpdated {
        response_id: ResponseId,
        score: i64,
        votes_count: u64,
        hot_score: f64,
    },
    TopListChanged {
        ranking: RankingKind,
        version: u64,
        ids: Vec<ResponseId>,
    },
}

impl Notification {
    #[must_use]
    pub fn score_updated(aggregate: &ResponseAggregate) -> Self {
        Self::ScoreUpdated {
            response_id: aggregate.response_id,
            score: aggregate.score,
            votes_count: aggregate.votes_count,
            hot_score: aggregate.hot_score,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScoreUpdated { .. } => "score_updated",
            Self::TopListChanged { .. } => "top_list_changed",
        }
    }

    /// Encodes as a text payload.
    #[must_use]
    pub fn to_payload(&self) -> Payload {
        // Every field is a plain number, enum or id, so encoding cannot fail.
        Payload::from(serde_json::to_string(self).unwrap_or_default())
    }
}
