use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("event not found")]
    NotFound,
    #[error("event already has a response")]
    AlreadyResponded,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("theme not found")]
    NotFound,
    #[error("not the theme owner")]
    Forbidden,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analyzer spawn failed: {message}")]
    Spawn { message: String },
    #[error("analyzer timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("analyzer exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("analyzer output was not valid JSON: {message}")]
    InvalidOutput { message: String },
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("log store query failed: {message}")]
    Query { message: String },
    #[error("log store returned status {status}")]
    Status { status: u16 },
    #[error("log store response malformed: {message}")]
    Malformed { message: String },
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Poll(#[from] PollError),
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl WatchError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
