//! Error types for Genforge

use genforge_types::{ErrorCode, ErrorEvent, ParseValueError};
use thiserror::Error;

/// Upper bound on error detail copied from upstream bodies or nested errors
pub const MAX_ERROR_DETAIL: usize = 300;

/// Main error type for Genforge
#[derive(Error, Debug)]
pub enum GenforgeError {
    /// Bad input, unsupported mode, sandbox violation, blocked prompt
    #[error("{0}")]
    Params(String),

    /// Missing artifact directory or version
    #[error("{0}")]
    NotFound(String),

    /// Upstream failure, empty response, timeout
    #[error("{0}")]
    System(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, GenforgeError>;

impl GenforgeError {
    pub fn params(message: impl Into<String>) -> Self {
        GenforgeError::Params(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        GenforgeError::NotFound(message.into())
    }

    pub fn system(message: impl Into<String>) -> Self {
        GenforgeError::System(message.into())
    }

    /// Stable numeric code of the error class
    pub fn code(&self) -> ErrorCode {
        match self {
            GenforgeError::Params(_) => ErrorCode::ParamsError,
            GenforgeError::NotFound(_) => ErrorCode::NotFoundError,
            _ => ErrorCode::SystemError,
        }
    }

    /// Terminal stream event for this error, with bounded detail
    pub fn to_event(&self) -> ErrorEvent {
        ErrorEvent::new(self.code(), truncate_detail(&self.to_string()))
    }
}

impl From<ParseValueError> for GenforgeError {
    fn from(e: ParseValueError) -> Self {
        GenforgeError::Params(e.to_string())
    }
}

impl From<config::ConfigError> for GenforgeError {
    fn from(e: config::ConfigError) -> Self {
        GenforgeError::Config(e.to_string())
    }
}

impl From<tokio::task::JoinError> for GenforgeError {
    fn from(e: tokio::task::JoinError) -> Self {
        GenforgeError::System(format!("background task failed: {}", e))
    }
}

/// Cut a message down to `MAX_ERROR_DETAIL` characters
pub fn truncate_detail(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_DETAIL) {
        Some((idx, _)) => format!("{}...", &message[..idx]),
        None => message.to_string(),
    }
}
