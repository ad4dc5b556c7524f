use crate::middleware::correlation::CorrelationId;
use crate::routes::error::map_error;
use crate::{build_watch, notify, AppState};
use aw_core::error::EventError;
use aw_events::types::{EventRecord, FilterOptions, NewEvent};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::Value;
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_RECENT_LIMIT: u32 = 100;
pub const MAX_RECENT_LIMIT: u32 = 1000;

#[derive(Debug, serde::Deserialize, ToSchema, IntoParams)]
pub struct RecentQuery {
    limit: Option<u32>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", post(ingest_event))
        .route("/events/recent", get(recent_events))
        .route("/events/filter-options", get(filter_options))
        .route("/events/{id}/respond", post(respond))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/events",
    request_body = NewEvent,
    responses(
        (status = 200, body = EventRecord),
        (status = 400, description = "missing required fields")
    )
)]
pub(crate) async fn ingest_event(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    payload: Result<Json<NewEvent>, JsonRejection>,
) -> Response {
    let Ok(Json(event)) = payload else {
        return map_error(
            &EventError::InvalidInput {
                message: "Missing required fields".to_string(),
            }
            .into(),
            Some(correlation.0),
        )
        .into_response();
    };
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match watch.events().ingest(event) {
        Ok(record) => Json(record).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/events/recent",
    params(RecentQuery),
    responses((status = 200, body = Vec<EventRecord>))
)]
pub(crate) async fn recent_events(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .min(MAX_RECENT_LIMIT);
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, None).into_response(),
    };
    match watch.events().recent(limit) {
        Ok(events) => Json(events).into_response(),
        Err(err) => map_error(&err, None).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/events/filter-options",
    responses((status = 200, body = FilterOptions))
)]
pub(crate) async fn filter_options(State(state): State<AppState>) -> Response {
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, None).into_response(),
    };
    match watch.events().filter_options() {
        Ok(options) => Json(options).into_response(),
        Err(err) => map_error(&err, None).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/events/{id}/respond",
    params(("id" = i64, Path, description = "Event ID")),
    request_body = Value,
    responses(
        (status = 200, body = EventRecord),
        (status = 404, description = "event not found"),
        (status = 409, description = "event already responded")
    )
)]
pub(crate) async fn respond(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<i64>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Ok(Json(response)) = payload else {
        return map_error(
            &EventError::InvalidInput {
                message: "invalid response body".to_string(),
            }
            .into(),
            Some(correlation.0),
        )
        .into_response();
    };
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    let updated = match watch.events().respond(id, response) {
        Ok(updated) => updated,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };

    // Best-effort callback to the agent, decoupled from this response. The
    // URL comes from the stored event, never from the request body.
    let callback_url = updated
        .human_in_the_loop
        .as_ref()
        .and_then(|hitl| hitl.response_web_socket_url.clone());
    if let Some(url) = callback_url {
        let record = updated.clone();
        tokio::spawn(async move {
            if let Err(err) = notify::send_response_to_agent(&url, &record).await {
                warn!(event_id = record.id, url = %url, error = %err, "agent notification failed");
            }
        });
    }

    Json(updated).into_response()
}
