use aw_core::error::{AnalysisError, EventError, PollError, ThemeError, WatchError};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub error: String,
    pub correlation_id: Option<String>,
}

pub fn map_error(
    err: &WatchError,
    correlation_id: Option<String>,
) -> (StatusCode, Json<ErrorEnvelope>) {
    let (status, code, error) = match err {
        WatchError::Event(event) => map_event_error(event),
        WatchError::Theme(theme) => map_theme_error(theme),
        WatchError::Analysis(analysis) => map_analysis_error(analysis),
        WatchError::Poll(poll) => map_poll_error(poll),
        WatchError::Internal { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            message.clone(),
        ),
    };

    (
        status,
        Json(ErrorEnvelope {
            code,
            error,
            correlation_id,
        }),
    )
}

fn map_event_error(err: &EventError) -> (StatusCode, &'static str, String) {
    match err {
        EventError::NotFound => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        EventError::AlreadyResponded => (StatusCode::CONFLICT, "conflict", err.to_string()),
        EventError::InvalidInput { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
        }
    }
}

fn map_theme_error(err: &ThemeError) -> (StatusCode, &'static str, String) {
    match err {
        ThemeError::NotFound => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        ThemeError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", err.to_string()),
        ThemeError::InvalidInput { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
        }
    }
}

// Analysis and poll failures are contained at their own boundary; they only
// reach HTTP through the internal catch-all if a handler misuses them.
fn map_analysis_error(err: &AnalysisError) -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "analysis_failed",
        err.to_string(),
    )
}

fn map_poll_error(err: &PollError) -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "poll_failed",
        err.to_string(),
    )
}
