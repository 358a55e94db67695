//! Cloud inventory error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("{0} not found in PATH")]
    BinaryNotFound(String),

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Unexpected response from {command}: {message}")]
    InvalidResponse { command: String, message: String },

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
