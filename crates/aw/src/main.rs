use aw_core::analysis::{AnalyzerConfig, DEFAULT_ANALYZER_COMMAND, DEFAULT_ANALYZER_TIMEOUT_SECS};
use aw_core::throttle::{AlertThrottle, DEFAULT_THROTTLE_WINDOW_SECS};
use aw_serve::polling::{
    PollerConfig, DEFAULT_ELASTICSEARCH_URL, DEFAULT_ERROR_THRESHOLD, DEFAULT_POLLING_INTERVAL_MS,
    DEFAULT_TIME_WINDOW,
};
use aw_serve::AppState;
use clap::{Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aw", about = "AgentWatch observability event server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the event server and the error-rate poller.
    Serve,
    /// Print the OpenAPI document and exit.
    Openapi,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve => serve().await,
        Command::Openapi => {
            println!("{}", aw_serve::openapi::generate_spec());
        }
    }
}

async fn serve() {
    aw_serve::openapi::ensure_initialized();

    let db_path =
        env_or("AGENTWATCH_DB_PATH", ".agentwatch/events.db");
    if let Some(parent) = Path::new(&db_path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let port = env_parsed("AGENTWATCH_PORT", 4056u16);
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);

    let analyzer = AnalyzerConfig {
        command: env_or("ANALYZER_CMD", DEFAULT_ANALYZER_COMMAND),
        timeout: Duration::from_secs(env_parsed(
            "ANALYZER_TIMEOUT_SECS",
            DEFAULT_ANALYZER_TIMEOUT_SECS,
        )),
    };
    let throttle = AlertThrottle::new(Duration::from_secs(env_parsed(
        "ALERT_THROTTLE_SECS",
        DEFAULT_THROTTLE_WINDOW_SECS,
    )));
    let poller = PollerConfig {
        elasticsearch_url: env_or("ELASTICSEARCH_URL", DEFAULT_ELASTICSEARCH_URL),
        interval: Duration::from_millis(env_parsed(
            "POLLING_INTERVAL_MS",
            DEFAULT_POLLING_INTERVAL_MS,
        )),
        error_threshold: env_parsed("ERROR_THRESHOLD", DEFAULT_ERROR_THRESHOLD),
        time_window: env_or("POLLING_TIME_WINDOW", DEFAULT_TIME_WINDOW),
        services: parse_services(&std::env::var("MONITORED_SERVICES").unwrap_or_default()),
    };

    let state = AppState::new(db_path, analyzer, throttle);

    let forwarder_state = state.clone();
    tokio::spawn(async move { aw_serve::hub::run_forwarder(forwarder_state).await });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller_state = state.clone();
    tokio::spawn(async move { aw_serve::polling::run(poller_state, poller, shutdown_rx).await });

    info!(%addr, "agentwatch listening");
    let shutdown = async move {
        wait_for_signal().await;
        info!("shutdown signal received; stopping poller");
        let _ = shutdown_tx.send(true);
    };
    if let Err(err) = aw_serve::serve_with_shutdown(state, addr, shutdown).await {
        error!(error = %err, "serve error");
    }
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_services(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|service| !service.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_services;

    #[test]
    fn services_list_is_trimmed_and_skips_blanks() {
        assert_eq!(
            parse_services(" resume-agent, job-analyzer ,,cover-letter-agent"),
            vec![
                "resume-agent".to_string(),
                "job-analyzer".to_string(),
                "cover-letter-agent".to_string()
            ]
        );
        assert!(parse_services("").is_empty());
    }
}
