pub mod hub;
pub mod middleware;
pub mod notify;
pub mod openapi;
pub mod polling;
pub mod routes;
pub mod trigger;

use aw_core::analysis::AnalyzerConfig;
use aw_core::throttle::AlertThrottle;
use aw_core::{AgentWatch, WatchError};
use aw_db::schema;
use aw_db::store::DbStore;
use aw_events::bus::EventBus;
use axum::Router;
use hub::Hub;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Events pushed to a freshly connected dashboard client.
pub const SNAPSHOT_EVENTS: u32 = 50;

#[derive(Clone)]
pub struct AppState {
    pub db_path: String,
    pub event_bus: EventBus,
    pub hub: Arc<Hub>,
    pub throttle: Arc<AlertThrottle>,
    pub analyzer: Arc<AnalyzerConfig>,
}

impl AppState {
    pub fn new(db_path: String, analyzer: AnalyzerConfig, throttle: AlertThrottle) -> Self {
        Self {
            db_path,
            event_bus: EventBus::new(1024),
            hub: Arc::new(Hub::new()),
            throttle: Arc::new(throttle),
            analyzer: Arc::new(analyzer),
        }
    }
}

/// Open a store handle for one request. WAL mode keeps concurrent readers
/// and the single logical writer path from blocking each other.
pub fn build_watch(state: &AppState) -> Result<AgentWatch<DbStore>, WatchError> {
    let conn = schema::open_and_migrate(&state.db_path).map_err(|err| WatchError::Internal {
        message: err.to_string(),
    })?;
    let store = DbStore::new(conn);
    Ok(AgentWatch::new(store, state.event_bus.clone()))
}

pub fn app(state: AppState) -> Router {
    routes::router(state)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await
}

pub async fn serve_with_shutdown<F>(
    state: AppState,
    addr: std::net::SocketAddr,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
}
