//! Per-subscriber WebSocket push channel.
//!
//! The socket is split: a writer task drains the connection's outbound queue into
//! the sink, and the read loop discards inbound frames until the peer closes or
//! errors. Whichever side ends first tears the connection down and unregisters it.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use hotboard_core::{
    notify::{Connection, NotificationHub, Payload},
    runtime::HotboardComponents,
    types::SubscriberId,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// GET /ws/{subscriber_id}
pub async fn handle_ws(
    ws: WebSocketUpgrade,
    State(components): State<HotboardComponents>,
    Path(subscriber_id): Path<i64>,
) -> impl IntoResponse {
    let hub = Arc::clone(&components.hub);
    ws.on_upgrade(move |socket| serve_socket(socket, hub, SubscriberId(subscriber_id)))
}

fn to_message(payload: Payload) -> Message {
    match payload {
        Payload::Text(text) => Message::Text(text.as_ref().into()),
        Payload::Binary(bytes) => Message::Binary(bytes),
    }
}

async fn write_outbound(
    connection: Arc<Connection>,
    mut outbound: mpsc::Receiver<Payload>,
    mut sink: futures::stream::SplitSink<WebSocket, Message>,
) {
    loop {
        tokio::select! {
            () = connection.closed() => break,

            payload = outbound.recv() => {
                let Some(payload) = payload else { break };
                if let Err(e) = sink.send(to_message(payload)).await {
                    debug!(subscriber = %connection.subscriber(), error = %e, "websocket write failed");
                    break;
                }
            }
        }
    }
    let _ = sink.send(Message::Close(None)).await;
}

async fn serve_socket(socket: WebSocket, hub: Arc<NotificationHub>, subscriber: SubscriberId) {
    let (connection, outbound) = Connection::new(subscriber, hub.channel_capacity());
    if let Err(e) = hub.register(Arc::clone(&connection)) {
        warn!(subscriber = %subscriber, error = %e, "rejecting websocket connection");
        return;
    }
    info!(subscriber = %subscriber, connection_id = %connection.id(), "websocket connected");

    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_outbound(Arc::clone(&connection), outbound, sink));

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(subscriber = %subscriber, error = %e, "websocket read failed");
                    break;
                }
            },

            _ = &mut writer => break,
        }
    }

    connection.close();
    hub.unregister(subscriber, connection.id());
    writer.abort();
    info!(subscriber = %subscriber, connection_id = %connection.id(), "websocket disconnected");
}
