//! Error types for weekboard
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad config, unknown task or week)
//! - 4: Operation failed (backend rejected, transport error, sync failure)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the weekboard CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for weekboard operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Week plan not found: {0}")]
    WeekNotFound(String),

    // Operation failures (exit code 4)
    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Async runtime unavailable: {0}")]
    Runtime(String),

    #[error("Sync failed: {0}")]
    SyncFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::ConfigNotFound(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_)
            | Error::WeekNotFound(_) => exit_codes::USER_ERROR,

            // Operation failures
            Error::Backend { .. }
            | Error::Http(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::Runtime(_)
            | Error::SyncFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// True when the backend answered with a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Backend { status: 404, .. })
    }

    /// Structured fields for machine-readable output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Backend { status, message } => Some(serde_json::json!({
                "status": status,
                "message": message,
            })),
            Error::ConfigNotFound(path) => Some(serde_json::json!({
                "path": path.to_string_lossy(),
            })),
            Error::TaskNotFound(id) => Some(serde_json::json!({ "task_id": id })),
            Error::WeekNotFound(id) => Some(serde_json::json!({ "week_id": id })),
            _ => None,
        }
    }
}

/// Result type alias for weekboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
