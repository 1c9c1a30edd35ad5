use super::{Connection, ConnectionError, NotificationConfig, Payload};
use crate::{metrics::MetricsCollector, types::SubscriberId};
use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::join_all;
use serde::Serialize;
use std::{
    collections::{hash_map, HashMap},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Outcome of a unicast or broadcast delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Connections that accepted the payload.
    pub delivered: usize,
    /// Connections that failed and were unregistered.
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub subscribers: usize,
    pub connections: usize,
}

/// Registry of live connections keyed by subscriber.
///
/// Built once at startup and shared by `Arc`. Sends work on a snapshot of the
/// registry taken before any await, so concurrent register/unregister never blocks
/// or invalidates a delivery in progress.
pub struct NotificationHub {
    subscribers: DashMap<SubscriberId, HashMap<Uuid, Arc<Connection>>>,
    send_timeout: Duration,
    channel_capacity: usize,
    metrics: Arc<MetricsCollector>,
}

impl NotificationHub {
    #[must_use]
    pub fn new(config: &NotificationConfig, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            subscribers: DashMap::new(),
            send_timeout: config.send_timeout(),
            channel_capacity: config.channel_capacity,
            metrics,
        }
    }

    /// Outbound queue size for connections created by the transport layer.
    #[must_use]
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Opens `connection` and adds it to its subscriber's set.
    ///
    /// A connection that is already closed cannot be registered; reconnecting
    /// clients must create a new one. Registering the same connection again is a
    /// no-op.
    pub fn register(&self, connection: Arc<Connection>) -> Result<(), ConnectionError> {
        if !connection.mark_open() && !connection.is_open() {
            return Err(ConnectionError::NotOpen);
        }

        let subscriber = connection.subscriber();
        let id = connection.id();
        let inserted = match self.subscribers.entry(subscriber).or_default().entry(id) {
            hash_map::Entry::Occupied(_) => false,
            hash_map::Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&connection));
                true
            }
        };
        if !inserted {
            return Ok(());
        }

        // Closed concurrently between mark_open and insert.
        if !connection.is_open() {
            self.unregister(subscriber, id);
            return Err(ConnectionError::Closed);
        }

        debug!(subscriber = %subscriber, connection_id = %id, "connection registered");
        self.metrics.record_active_connections(self.connection_count());
        Ok(())
    }

    /// Removes and closes the connection. Removes the subscriber entry once it has no
    /// connections left. Unknown connections are ignored.
    pub fn unregister(&self, subscriber: SubscriberId, connection_id: Uuid) -> bool {
        let mut removed = false;
        if let Entry::Occupied(mut entry) = self.subscribers.entry(subscriber) {
            let connections = entry.get_mut();
            if let Some(connection) = connections.remove(&connection_id) {
                connection.close();
                removed = true;
            }
            if connections.is_empty() {
                entry.remove();
            }
        }

        if removed {
            debug!(subscriber = %subscriber, connection_id = %connection_id, "connection unregistered");
            self.metrics.record_active_connections(self.connection_count());
        }
        removed
    }

    /// Delivers `payload` to every connection of `subscriber`.
    pub async fn send_to(&self, subscriber: SubscriberId, payload: Payload) -> DeliveryReport {
        let snapshot = self
            .subscribers
            .get(&subscriber)
            .map(|entry| entry.value().values().cloned().collect())
            .unwrap_or_default();
        self.deliver(snapshot, payload).await
    }

    /// Delivers `payload` to every registered connection.
    pub async fn broadcast(&self, payload: Payload) -> DeliveryReport {
        let snapshot: Vec<Arc<Connection>> = self
            .subscribers
            .iter()
            .flat_map(|entry| entry.value().values().cloned().collect::<Vec<_>>())
            .collect();
        self.deliver(snapshot, payload).await
    }

    async fn deliver(&self, connections: Vec<Arc<Connection>>, payload: Payload) -> DeliveryReport {
        if connections.is_empty() {
            return DeliveryReport::default();
        }

        let timeout = self.send_timeout;
        let results = join_all(connections.iter().map(|connection| {
            let payload = payload.clone();
            async move { connection.send(payload, timeout).await }
        }))
        .await;

        let mut report = DeliveryReport::default();
        for (connection, result) in connections.iter().zip(results) {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        subscriber = %connection.subscriber(),
                        connection_id = %connection.id(),
                        error = %e,
                        "dropping connection after failed send"
                    );
                    self.metrics.record_connection_dropped(e.as_metric_str());
                    self.unregister(connection.subscriber(), connection.id());
                    report.dropped += 1;
                }
            }
        }
        report
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.subscribers.iter().map(|entry| entry.value().len()).sum()
    }

    #[must_use]
    pub fn connections_for(&self, subscriber: SubscriberId) -> usize {
        self.subscribers.get(&subscriber).map_or(0, |entry| entry.value().len())
    }

    #[must_use]
    pub fn stats(&self) -> HubStats {
        let mut stats = HubStats::default();
        for entry in &self.subscribers {
            stats.subscribers += 1;
            stats.connections += entry.value().len();
        }
        stats
    }

    /// Closes and forgets every connection. Used on shutdown.
    pub fn close_all(&self) {
        for entry in &self.subscribers {
            for connection in entry.value().values() {
                connection.close();
            }
        }
        self.subscribers.clear();
        self.metrics.record_active_connections(0);
    }
}
