use crate::middleware::correlation::CorrelationId;
use crate::routes::error::map_error;
use crate::{build_watch, trigger, AppState};
use aw_core::alerts::should_analyze;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use serde_json::{json, Value};
use tracing::info;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/alerts/trigger", post(trigger_alert))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/alerts/trigger",
    request_body = Value,
    responses(
        (status = 200, description = "alert stored; analysis possibly triggered"),
        (status = 500, description = "alert could not be stored")
    )
)]
pub(crate) async fn trigger_alert(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    // Webhook bodies are passthrough; an empty or non-JSON body still
    // produces a stored (if useless) alert event.
    let body = body.map_or_else(|_| json!({}), |Json(value)| value);
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    let (record, alert) = match watch.alerts().ingest_external(&body) {
        Ok(stored) => stored,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };

    // Analysis is detached before the response goes out; a broken analyzer
    // must never fail the external alerting system's webhook call.
    if should_analyze(&alert) {
        trigger::spawn_analysis(&state, alert);
    } else {
        info!(
            service = %alert.service,
            alert = %alert.alert_name,
            severity = %alert.severity,
            error_count = alert.error_count,
            "alert below analysis criteria; stored only"
        );
    }

    Json(json!({ "success": true, "event_id": record.id })).into_response()
}
