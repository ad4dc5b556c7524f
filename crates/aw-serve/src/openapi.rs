use crate::routes::events::RecentQuery;
use aw_core::alerts::Alert;
use aw_core::themes::{CreateThemeInput, Theme, ThemeExport, ThemeFilter, UpdateThemeInput};
use aw_events::types::{EventRecord, FilterOptions, HumanInTheLoop, NewEvent, StreamMessage};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::events::ingest_event,
        crate::routes::events::recent_events,
        crate::routes::events::filter_options,
        crate::routes::events::respond,
        crate::routes::alerts::trigger_alert,
        crate::routes::stats::stats,
        crate::routes::themes::search_themes,
        crate::routes::themes::create_theme,
        crate::routes::themes::get_theme,
        crate::routes::themes::update_theme,
        crate::routes::themes::delete_theme,
        crate::routes::themes::export_theme,
        crate::routes::themes::import_theme,
    ),
    components(schemas(
        EventRecord,
        NewEvent,
        HumanInTheLoop,
        FilterOptions,
        StreamMessage,
        RecentQuery,
        Alert,
        Theme,
        CreateThemeInput,
        UpdateThemeInput,
        ThemeFilter,
        ThemeExport,
    ))
)]
struct ApiDoc;

pub fn generate_spec() -> String {
    ApiDoc::openapi()
        .to_json()
        .unwrap_or_else(|_| "{}".to_string())
}

pub fn ensure_initialized() {
    let _ = ApiDoc::openapi();
}

pub fn router() -> Router {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

async fn swagger_ui() -> impl IntoResponse {
    let html = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>AgentWatch API Docs</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
      window.ui = SwaggerUIBundle({ url: '/openapi.json', dom_id: '#swagger-ui' });
    </script>
  </body>
</html>
"#;
    axum::response::Html(html)
}
