use crate::{build_watch, AppState, SNAPSHOT_EVENTS};
use aw_events::types::StreamMessage;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Registry of connected dashboard clients.
///
/// Each client is a per-socket unbounded sender; a writer task drains it
/// into the socket. A client whose channel is gone is removed during the
/// next broadcast, so a broken client never blocks the rest.
pub struct Hub {
    clients: Mutex<HashMap<u64, mpsc::UnboundedSender<Message>>>,
    next_id: AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn register(&self, sender: mpsc::UnboundedSender<Message>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients.lock().await.insert(id, sender);
        id
    }

    pub async fn deregister(&self, id: u64) {
        self.clients.lock().await.remove(&id);
    }

    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Serialize once, deliver to every registered client. Clients whose
    /// channel rejects the message are dropped from the registry.
    pub async fn broadcast(&self, message: &StreamMessage) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "failed to serialize stream message");
                return;
            }
        };
        let mut clients = self.clients.lock().await;
        let mut dead = Vec::new();
        for (id, sender) in clients.iter() {
            if sender.send(text_message(text.clone())).is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            debug!(client = id, "dropping disconnected stream client");
            clients.remove(&id);
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// Pump every bus message into the hub. Runs for the life of the server.
pub async fn run_forwarder(state: AppState) {
    let mut receiver = state.event_bus.subscribe();
    loop {
        match receiver.recv().await {
            Ok(message) => state.hub.broadcast(&message).await,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "stream forwarder lagged; events dropped from broadcast");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/stream", get(stream_handler))
        .with_state(state)
}

async fn stream_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_socket(socket, state))
            .into_response(),
        // Plain GETs land here; answer with a banner instead of a 4xx.
        Err(_) => "agentwatch event stream: connect with a WebSocket client".into_response(),
    }
}

async fn handle_socket(stream: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Snapshot goes through the same channel as live messages, so a client
    // always sees `initial` before anything broadcast after registration.
    let snapshot = match build_watch(&state).and_then(|watch| watch.events().recent(SNAPSHOT_EVENTS)) {
        Ok(events) => events,
        Err(err) => {
            warn!(error = %err, "failed to load snapshot for new stream client");
            Vec::new()
        }
    };
    let initial = StreamMessage::Initial(snapshot);
    if let Ok(text) = serde_json::to_string(&initial) {
        let _ = tx.send(text_message(text));
    }
    let client_id = state.hub.register(tx).await;

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    // No client-to-server protocol; drain until the socket closes.
    while let Some(Ok(message)) = receiver.next().await {
        if matches!(message, Message::Close(_)) {
            break;
        }
    }

    state.hub.deregister(client_id).await;
    writer.abort();
}

fn text_message(value: String) -> Message {
    Message::Text(Utf8Bytes::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aw_events::types::{EventRecord, StreamMessage};
    use chrono::Utc;

    fn record(id: i64) -> EventRecord {
        EventRecord {
            id,
            source_app: "resume-agent".to_string(),
            session_id: "s1".to_string(),
            hook_event_type: "PreToolUse".to_string(),
            payload: serde_json::json!({}),
            human_in_the_loop: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_registered_client() {
        let hub = Hub::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        hub.register(tx_a).await;
        hub.register(tx_b).await;

        hub.broadcast(&StreamMessage::Event(record(1))).await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn failed_client_is_dropped_and_the_rest_still_receive() {
        let hub = Hub::new();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        drop(rx_dead);
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        hub.register(tx_dead).await;
        hub.register(tx_live).await;
        assert_eq!(hub.client_count().await, 2);

        hub.broadcast(&StreamMessage::Event(record(1))).await;

        assert_eq!(hub.client_count().await, 1);
        let Message::Text(text) = rx_live.try_recv().unwrap() else {
            panic!("expected text frame");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["type"], "event");
        assert_eq!(value["data"]["id"], 1);
    }

    #[tokio::test]
    async fn deregister_removes_the_client() {
        let hub = Hub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await;
        hub.deregister(id).await;
        hub.broadcast(&StreamMessage::Event(record(1))).await;
        assert!(rx.try_recv().is_err());
    }
}
