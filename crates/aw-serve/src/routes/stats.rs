use crate::routes::error::map_error;
use crate::{build_watch, AppState};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

pub fn router(state: AppState) -> Router {
    Router::new().route("/stats", get(stats)).with_state(state)
}

#[utoipa::path(get, path = "/stats", responses((status = 200)))]
pub(crate) async fn stats(State(state): State<AppState>) -> Response {
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, None).into_response(),
    };
    let event_count = match watch.events().count() {
        Ok(count) => count,
        Err(err) => return map_error(&err, None).into_response(),
    };
    let client_count = state.hub.client_count().await;
    Json(json!({ "event_count": event_count, "client_count": client_count })).into_response()
}
