use crate::types::SubscriberId;
use bytes::Bytes;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

/// Lifecycle of one live client connection. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Opaque outbound message body. Cloning is cheap for both variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(Arc<str>),
    Binary(Bytes),
}

impl Payload {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(Arc::from(text))
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(Arc::from(text))
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    /// The client side went away (outbound queue receiver dropped).
    #[error("Connection closed by peer")]
    Closed,

    /// The outbound queue stayed full for the whole send window.
    #[error("Send timed out after {0:?}")]
    Timeout(Duration),

    /// The connection is not in the `Open` state.
    #[error("Connection is not open")]
    NotOpen,
}

impl ConnectionError {
    #[must_use]
    pub fn as_metric_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Timeout(_) => "timeout",
            Self::NotOpen => "not_open",
        }
    }
}

/// Server-side handle of one client connection.
///
/// The socket task owns the receiving end of the outbound queue and drains it into
/// the transport. Everyone else holds an `Arc<Connection>` and pushes [`Payload`]s.
#[derive(Debug)]
pub struct Connection {
    id: Uuid,
    subscriber: SubscriberId,
    state: watch::Sender<ConnectionState>,
    outbound: mpsc::Sender<Payload>,
}

impl Connection {
    /// Creates a connection in `Connecting` state together with its outbound queue.
    #[must_use]
    pub fn new(subscriber: SubscriberId, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Payload>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let connection = Arc::new(Self { id: Uuid::new_v4(), subscriber, state, outbound });
        (connection, rx)
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// `Connecting → Open`. Returns `false` for any other starting state.
    pub fn mark_open(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Open;
                true
            } else {
                false
            }
        })
    }

    /// Moves to `Closed`. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Closed {
                false
            } else {
                *state = ConnectionState::Closed;
                true
            }
        })
    }

    /// Resolves once the connection is closed.
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this only returns once the state is Closed.
        let _ = rx.wait_for(|state| *state == ConnectionState::Closed).await;
    }

    /// Queues `payload` for the socket task, waiting at most `timeout` for room.
    pub async fn send(&self, payload: Payload, timeout: Duration) -> Result<(), ConnectionError> {
        if !self.is_open() {
            return Err(ConnectionError::NotOpen);
        }
        match tokio::time::timeout(timeout, self.outbound.send(payload)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(ConnectionError::Closed),
            Err(_) => Err(ConnectionError::Timeout(timeout)),
        }
    }
}
