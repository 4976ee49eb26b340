// Error types for authdiff
// Only the loading and configuration surfaces can fail; the comparison
// pipeline itself is infallible.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthDiffError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Capture file is readable but not a usable HAR document
    #[error("Invalid capture {path}: {reason}")]
    InvalidCapture { path: String, reason: String },

    #[error("Invalid session configuration: {0}")]
    InvalidSessionConfig(String),

    #[error("Session already exists: {0}")]
    DuplicateSession(String),

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("Invalid scope pattern: {0}")]
    InvalidScope(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, AuthDiffError>;
