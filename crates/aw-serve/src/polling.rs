use crate::{build_watch, trigger, AppState};
use aw_core::alerts::Alert;
use aw_core::error::PollError;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

pub const DEFAULT_ELASTICSEARCH_URL: &str = "http://localhost:9200";
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_ERROR_THRESHOLD: i64 = 10;
pub const DEFAULT_TIME_WINDOW: &str = "5m";

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub elasticsearch_url: String,
    pub interval: Duration,
    pub error_threshold: i64,
    /// Lookback window in the log store's duration syntax, e.g. "5m".
    pub time_window: String,
    pub services: Vec<String>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            elasticsearch_url: DEFAULT_ELASTICSEARCH_URL.to_string(),
            interval: Duration::from_millis(DEFAULT_POLLING_INTERVAL_MS),
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            time_window: DEFAULT_TIME_WINDOW.to_string(),
            services: Vec::new(),
        }
    }
}

/// Periodic error-rate sampling loop.
///
/// Each tick queries the log store once per monitored service; a count past
/// the threshold becomes a `PollingAlert` event (persisted, broadcast) and a
/// detached analysis run. A failed query is logged and the cycle moves on to
/// the next service. Ticks never overlap: a cycle slower than the interval
/// just delays the next tick.
pub async fn run(state: AppState, config: PollerConfig, mut shutdown: watch::Receiver<bool>) {
    if config.services.is_empty() {
        info!("no monitored services configured; error-rate poller idle");
        return;
    }
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            warn!(error = %err, "failed to build log store client; poller disabled");
            return;
        }
    };
    info!(
        services = config.services.len(),
        interval_ms = config.interval.as_millis() as u64,
        threshold = config.error_threshold,
        "error-rate poller started"
    );

    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {
                info!("error-rate poller stopping");
                return;
            }
        }
        for service in &config.services {
            match query_error_count(&client, &config, service).await {
                Ok(count) if count > config.error_threshold => {
                    raise_alert(&state, &config, service, count);
                }
                Ok(count) => {
                    tracing::debug!(service = %service, count, "error count under threshold");
                }
                Err(err) => {
                    warn!(service = %service, error = %err, "error-rate query failed");
                }
            }
        }
    }
}

/// One `_count` query scoped to the service, error level, and lookback
/// window.
pub async fn query_error_count(
    client: &reqwest::Client,
    config: &PollerConfig,
    service: &str,
) -> Result<i64, PollError> {
    let url = format!(
        "{}/logs-*/_count",
        config.elasticsearch_url.trim_end_matches('/')
    );
    let body = json!({
        "query": {
            "bool": {
                "filter": [
                    { "term": { "service.name": service } },
                    { "term": { "log.level": "error" } },
                    { "range": { "@timestamp": { "gte": format!("now-{}", config.time_window) } } }
                ]
            }
        }
    });
    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|err| PollError::Query {
            message: err.to_string(),
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(PollError::Status {
            status: status.as_u16(),
        });
    }
    let value: Value = response.json().await.map_err(|err| PollError::Malformed {
        message: err.to_string(),
    })?;
    value
        .get("count")
        .and_then(Value::as_i64)
        .ok_or_else(|| PollError::Malformed {
            message: "missing count field".to_string(),
        })
}

fn raise_alert(state: &AppState, config: &PollerConfig, service: &str, count: i64) {
    let alert = Alert::from_polling(
        service,
        count,
        config.error_threshold,
        &config.time_window,
        Utc::now(),
    );
    warn!(
        service = %service,
        error_count = count,
        threshold = config.error_threshold,
        "error rate above threshold"
    );
    match build_watch(state).and_then(|watch| watch.alerts().ingest_polling(&alert)) {
        Ok(record) => {
            trigger::spawn_analysis(state, alert);
            tracing::debug!(event_id = record.id, "polling alert stored");
        }
        Err(err) => {
            warn!(service = %service, error = %err, "failed to store polling alert");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicU16, Ordering};
    use std::sync::Arc;

    async fn mock_log_store(count: i64, status: u16) -> std::net::SocketAddr {
        let status = Arc::new(AtomicU16::new(status));
        let app = Router::new().route(
            "/{index}/_count",
            post(move |Json(body): Json<Value>| {
                let status = status.clone();
                async move {
                    // The query must scope by service, level, and window.
                    let filters = body["query"]["bool"]["filter"].as_array().unwrap().clone();
                    assert!(filters
                        .iter()
                        .any(|f| f["term"]["log.level"] == "error"));
                    let code = axum::http::StatusCode::from_u16(status.load(Ordering::Relaxed))
                        .unwrap();
                    (code, Json(json!({ "count": count })))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn config_for(addr: std::net::SocketAddr) -> PollerConfig {
        PollerConfig {
            elasticsearch_url: format!("http://{addr}"),
            services: vec!["resume-agent".to_string()],
            ..PollerConfig::default()
        }
    }

    #[tokio::test]
    async fn count_is_read_from_the_log_store_response() {
        let addr = mock_log_store(42, 200).await;
        let client = reqwest::Client::new();
        let count = query_error_count(&client, &config_for(addr), "resume-agent")
            .await
            .unwrap();
        assert_eq!(count, 42);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let addr = mock_log_store(0, 503).await;
        let client = reqwest::Client::new();
        let err = query_error_count(&client, &config_for(addr), "resume-agent")
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn unreachable_store_is_a_query_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = reqwest::Client::new();
        let err = query_error_count(&client, &config_for(addr), "resume-agent")
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Query { .. }));
    }
}
