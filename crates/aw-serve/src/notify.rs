use aw_events::types::EventRecord;
use futures::SinkExt;
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between the send and the close frame so the message flushes
/// before teardown.
const SEND_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("serialize failed: {message}")]
    Serialize { message: String },
    #[error("connect failed: {message}")]
    Connect { message: String },
    #[error("send failed: {message}")]
    Send { message: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Deliver one HITL response to the agent listening at `url`.
///
/// Single-shot: connect, send the updated event as one text frame, wait a
/// short grace period, close. The whole sequence runs under one timeout;
/// a connection that never opens, errors after opening, or rejects the
/// send all resolve to an error instead of hanging. No retry — the stored
/// response is already authoritative and delivery is best-effort.
pub async fn send_response_to_agent(url: &str, event: &EventRecord) -> Result<(), NotifyError> {
    send_with_timeout(url, event, NOTIFY_TIMEOUT).await
}

pub async fn send_with_timeout(
    url: &str,
    event: &EventRecord,
    timeout: Duration,
) -> Result<(), NotifyError> {
    let text = serde_json::to_string(event).map_err(|err| NotifyError::Serialize {
        message: err.to_string(),
    })?;
    let attempt = async move {
        let (mut socket, _) = connect_async(url)
            .await
            .map_err(|err| NotifyError::Connect {
                message: err.to_string(),
            })?;
        socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|err| NotifyError::Send {
                message: err.to_string(),
            })?;
        tokio::time::sleep(SEND_GRACE).await;
        let _ = socket.close(None).await;
        Ok(())
    };
    tokio::time::timeout(timeout, attempt)
        .await
        .map_err(|_| NotifyError::Timeout(timeout))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use aw_events::types::EventRecord;
    use axum::extract::ws::WebSocketUpgrade;
    use axum::response::Response;
    use axum::routing::get;
    use axum::Router;
    use chrono::Utc;
    use futures::StreamExt;
    use tokio::sync::oneshot;

    fn record() -> EventRecord {
        EventRecord {
            id: 3,
            source_app: "resume-agent".to_string(),
            session_id: "s1".to_string(),
            hook_event_type: "Notification".to_string(),
            payload: serde_json::json!({}),
            human_in_the_loop: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn delivers_one_frame_to_a_listening_agent() {
        let (frame_tx, frame_rx) = oneshot::channel::<String>();
        let frame_tx = std::sync::Arc::new(tokio::sync::Mutex::new(Some(frame_tx)));
        let app = Router::new().route(
            "/agent",
            get(move |ws: WebSocketUpgrade| {
                let frame_tx = frame_tx.clone();
                async move {
                    let response: Response = ws.on_upgrade(move |mut socket| async move {
                        if let Some(Ok(axum::extract::ws::Message::Text(text))) =
                            socket.next().await
                        {
                            if let Some(tx) = frame_tx.lock().await.take() {
                                let _ = tx.send(text.to_string());
                            }
                        }
                    });
                    response
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = format!("ws://{addr}/agent");
        send_with_timeout(&url, &record(), Duration::from_secs(5))
            .await
            .unwrap();

        let delivered = frame_rx.await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&delivered).unwrap();
        assert_eq!(value["id"], 3);
    }

    #[tokio::test]
    async fn refused_connection_fails_fast() {
        // Bind then drop to get an address nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = send_with_timeout(
            &format!("ws://{addr}/agent"),
            &record(),
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NotifyError::Connect { .. }));
    }

    #[tokio::test]
    async fn handshake_that_never_completes_times_out() {
        // Accepts TCP but never answers the WebSocket handshake.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                if let Ok((socket, _)) = listener.accept().await {
                    held.push(socket);
                }
            }
        });

        let started = std::time::Instant::now();
        let err = send_with_timeout(
            &format!("ws://{addr}/agent"),
            &record(),
            Duration::from_millis(300),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NotifyError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
