//! Notification hub delivery and registry churn.
//!
//! These tests verify that:
//! - A failing connection is dropped while its sibling still receives the message
//! - Unregistering twice is a no-op, and so is registering the same connection twice
//! - Broadcasts reach every subscriber and only report live connections
//! - Concurrent register/unregister during broadcasts never deadlocks or loses live connections
//! - The refresher pushes `score_updated` to the author and `top_list_changed` to everyone

use crate::mock_infrastructure::{seed_response, t0, upvotes, Harness};
use futures::future::join_all;
use hotboard_core::{
    cache::MemoryRankCache,
    metrics::MetricsCollector,
    notify::{Connection, NotificationConfig, NotificationHub, Payload},
    store::InMemoryScoreStore,
    types::SubscriberId,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

fn hub_with(send_timeout_ms: u64, channel_capacity: usize) -> Arc<NotificationHub> {
    let config = NotificationConfig { send_timeout_ms, channel_capacity, ..Default::default() };
    Arc::new(NotificationHub::new(&config, Arc::new(MetricsCollector::new())))
}

fn hub() -> Arc<NotificationHub> {
    hub_with(50, 4)
}

fn connect(hub: &NotificationHub, subscriber: i64) -> (Arc<Connection>, mpsc::Receiver<Payload>) {
    let (connection, rx) = Connection::new(SubscriberId(subscriber), hub.channel_capacity());
    hub.register(Arc::clone(&connection)).unwrap();
    (connection, rx)
}

fn decode(payload: &Payload) -> serde_json::Value {
    let Payload::Text(text) = payload else {
        panic!("expected text payload, got {payload:?}");
    };
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_failing_connection_dropped_sibling_still_served() {
    let hub = hub();
    let (_dead, dead_rx) = connect(&hub, 1);
    let (alive, mut alive_rx) = connect(&hub, 1);
    drop(dead_rx);

    let report = hub.send_to(SubscriberId(1), Payload::from("hello")).await;
    assert_eq!(report.delivered, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(hub.connections_for(SubscriberId(1)), 1);
    assert!(alive.is_open());
    assert_eq!(alive_rx.recv().await, Some(Payload::from("hello")));
}

#[tokio::test]
async fn test_full_queue_counts_as_failure() {
    let hub = hub();
    let (stuck, _stuck_rx) = connect(&hub, 1);

    for _ in 0..hub.channel_capacity() {
        assert_eq!(hub.send_to(SubscriberId(1), Payload::from("x")).await.delivered, 1);
    }
    let report = hub.send_to(SubscriberId(1), Payload::from("overflow")).await;
    assert_eq!(report.dropped, 1);
    assert!(!stuck.is_open());
    assert_eq!(hub.connection_count(), 0);
}

#[tokio::test]
async fn test_unregister_is_idempotent() {
    let hub = hub();
    let (connection, _rx) = connect(&hub, 5);

    assert!(hub.unregister(SubscriberId(5), connection.id()));
    assert!(!hub.unregister(SubscriberId(5), connection.id()));
    assert_eq!(hub.connections_for(SubscriberId(5)), 0);
    assert_eq!(hub.stats().subscribers, 0);
}

#[tokio::test]
async fn test_reregistered_connection_delivers_once() {
    let hub = hub();
    let (connection, mut rx) = connect(&hub, 6);
    hub.register(Arc::clone(&connection)).unwrap();
    assert_eq!(hub.connection_count(), 1);

    let report = hub.send_to(SubscriberId(6), Payload::from("once")).await;
    assert_eq!(report.delivered, 1);
    assert_eq!(rx.recv().await, Some(Payload::from("once")));
    assert!(rx.try_recv().is_err());

    assert!(hub.unregister(SubscriberId(6), connection.id()));
    assert_eq!(hub.connections_for(SubscriberId(6)), 0);
    assert_eq!(hub.stats().subscribers, 0);
}

#[tokio::test]
async fn test_send_to_unknown_subscriber_is_empty_report() {
    let report = hub().send_to(SubscriberId(404), Payload::from("nobody")).await;
    assert_eq!((report.delivered, report.dropped), (0, 0));
}

#[tokio::test]
async fn test_broadcast_reaches_every_subscriber() {
    let hub = hub();
    let mut receivers = Vec::new();
    for subscriber in 1..=3 {
        receivers.push(connect(&hub, subscriber));
    }

    let report = hub.broadcast(Payload::from("all")).await;
    assert_eq!(report.delivered, 3);
    for (_, rx) in &mut receivers {
        assert_eq!(rx.recv().await, Some(Payload::from("all")));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_churn_during_broadcasts() {
    // Queues deep enough that no send in this test can time out.
    let hub = hub_with(1000, 64);
    let (steady, mut steady_rx) = connect(&hub, 0);

    let drain = tokio::spawn(async move {
        let mut received = 0_usize;
        while steady_rx.recv().await.is_some() {
            received += 1;
        }
        received
    });

    let churners = (1..=8).map(|subscriber| {
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            for _ in 0..50 {
                let (connection, _rx) = Connection::new(SubscriberId(subscriber), 64);
                if hub.register(Arc::clone(&connection)).is_ok() {
                    tokio::task::yield_now().await;
                    hub.unregister(SubscriberId(subscriber), connection.id());
                }
            }
        })
    });
    let broadcasts = (0..50).map(|_| {
        let hub = Arc::clone(&hub);
        tokio::spawn(async move { hub.broadcast(Payload::from("tick")).await })
    });

    let (churn_results, reports) = tokio::time::timeout(
        Duration::from_secs(5),
        futures::future::join(join_all(churners), join_all(broadcasts)),
    )
    .await
    .expect("churn must not deadlock");
    assert!(churn_results.iter().all(Result::is_ok));
    assert!(reports.iter().all(Result::is_ok));

    assert_eq!(hub.connection_count(), 1);
    hub.close_all();
    assert_eq!(hub.connection_count(), 0);
    assert!(!steady.is_open());
    drop((steady, hub));

    let received = drain.await.unwrap();
    assert_eq!(received, 50);
}

#[tokio::test]
async fn test_refresher_pushes_author_and_ranking_updates() {
    let store = Arc::new(InMemoryScoreStore::new());
    let author = SubscriberId(42);
    let response = seed_response(&store, 1, t0(), Some(author), &upvotes(2), t0());
    let harness = Harness::new(store, Arc::new(MemoryRankCache::new(10)));

    let (_author_conn, mut author_rx) = connect(&harness.hub, 42);
    let (_viewer_conn, mut viewer_rx) = connect(&harness.hub, 7);

    harness.refresher.on_vote_recorded(response).await.unwrap();

    // The inline rebuild publishes both rankings for the first time.
    let mut viewer_kinds = Vec::new();
    while let Ok(payload) = viewer_rx.try_recv() {
        let message = decode(&payload);
        assert_eq!(message["type"], "top_list_changed");
        assert_eq!(message["ids"], serde_json::json!([1]));
        viewer_kinds.push(message["ranking"].as_str().unwrap().to_string());
    }
    viewer_kinds.sort();
    assert_eq!(viewer_kinds, vec!["hot", "most_voted"]);

    let mut author_messages = Vec::new();
    while let Ok(payload) = author_rx.try_recv() {
        author_messages.push(decode(&payload));
    }
    let score_update = author_messages
        .iter()
        .find(|m| m["type"] == "score_updated")
        .expect("author should receive a score update");
    assert_eq!(score_update["response_id"], 1);
    assert_eq!(score_update["score"], 2);
    assert_eq!(score_update["votes_count"], 2);
}

#[tokio::test]
async fn test_unchanged_ranking_is_not_rebroadcast() {
    let store = Arc::new(InMemoryScoreStore::new());
    seed_response(&store, 1, t0(), None, &upvotes(1), t0());
    let harness = Harness::new(store, Arc::new(MemoryRankCache::new(10)));
    let (_viewer, mut viewer_rx) = connect(&harness.hub, 7);

    harness.refresher.rebuild_top_list(5).await.unwrap();
    let mut first = 0;
    while viewer_rx.try_recv().is_ok() {
        first += 1;
    }
    assert_eq!(first, 2);

    harness.refresher.rebuild_top_list(5).await.unwrap();
    assert!(viewer_rx.try_recv().is_err());
    assert_eq!(harness.hub.connections_for(SubscriberId(7)), 1);
}
