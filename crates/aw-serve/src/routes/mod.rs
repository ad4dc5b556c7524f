pub mod alerts;
pub mod error;
pub mod events;
pub mod stats;
pub mod themes;

use crate::middleware::correlation::correlation_middleware;
use crate::{hub, openapi, AppState};
use axum::middleware;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(events::router(state.clone()))
        .merge(alerts::router(state.clone()))
        .merge(stats::router(state.clone()))
        .merge(hub::router(state.clone()))
        .merge(openapi::router())
        .nest("/api", themes::router(state))
        .route_layer(middleware::from_fn(correlation_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
