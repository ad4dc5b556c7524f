use crate::middleware::correlation::CorrelationId;
use crate::routes::error::map_error;
use crate::{build_watch, AppState};
use aw_core::themes::{CreateThemeInput, Theme, ThemeExport, ThemeFilter, UpdateThemeInput};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Extension, Json, Router};

/// Ownership header for theme mutations. A theme with an `authorId` can
/// only be changed by requests carrying the matching value here.
const AUTHOR_HEADER: &str = "x-author-id";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/themes", get(search_themes))
        .route("/themes", post(create_theme))
        .route("/themes/import", post(import_theme))
        .route("/themes/{id}", get(get_theme))
        .route("/themes/{id}", put(update_theme))
        .route("/themes/{id}", delete(delete_theme))
        .route("/themes/{id}/export", get(export_theme))
        .with_state(state)
}

fn requester(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[utoipa::path(
    get,
    path = "/api/themes",
    params(ThemeFilter),
    responses((status = 200, body = Vec<Theme>))
)]
pub(crate) async fn search_themes(
    State(state): State<AppState>,
    Query(filter): Query<ThemeFilter>,
) -> Response {
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, None).into_response(),
    };
    match watch.themes().search(&filter) {
        Ok(themes) => Json(themes).into_response(),
        Err(err) => map_error(&err, None).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/themes",
    request_body = CreateThemeInput,
    responses((status = 201, body = Theme), (status = 400))
)]
pub(crate) async fn create_theme(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(input): Json<CreateThemeInput>,
) -> Response {
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match watch.themes().create(input) {
        Ok(theme) => (StatusCode::CREATED, Json(theme)).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/themes/{id}",
    params(("id" = String, Path, description = "Theme ID")),
    responses((status = 200, body = Theme), (status = 404))
)]
pub(crate) async fn get_theme(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, None).into_response(),
    };
    match watch.themes().get(&id) {
        Ok(theme) => Json(theme).into_response(),
        Err(err) => map_error(&err, None).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/themes/{id}",
    params(("id" = String, Path, description = "Theme ID")),
    request_body = UpdateThemeInput,
    responses((status = 200, body = Theme), (status = 403), (status = 404))
)]
pub(crate) async fn update_theme(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<UpdateThemeInput>,
) -> Response {
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match watch
        .themes()
        .update(&id, input, requester(&headers).as_deref())
    {
        Ok(theme) => Json(theme).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/themes/{id}",
    params(("id" = String, Path, description = "Theme ID")),
    responses((status = 200), (status = 403), (status = 404))
)]
pub(crate) async fn delete_theme(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match watch.themes().delete(&id, requester(&headers).as_deref()) {
        Ok(()) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/themes/{id}/export",
    params(("id" = String, Path, description = "Theme ID")),
    responses((status = 200, body = ThemeExport), (status = 404))
)]
pub(crate) async fn export_theme(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, None).into_response(),
    };
    match watch.themes().export(&id) {
        Ok(export) => Json(export).into_response(),
        Err(err) => map_error(&err, None).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/themes/import",
    request_body = ThemeExport,
    responses((status = 201, body = Theme), (status = 400))
)]
pub(crate) async fn import_theme(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    headers: HeaderMap,
    Json(export): Json<ThemeExport>,
) -> Response {
    let watch = match build_watch(&state) {
        Ok(watch) => watch,
        Err(err) => return map_error(&err, Some(correlation.0)).into_response(),
    };
    match watch.themes().import(export, requester(&headers)) {
        Ok(theme) => (StatusCode::CREATED, Json(theme)).into_response(),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}
