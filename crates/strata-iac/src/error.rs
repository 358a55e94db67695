//! IaC executor error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IacError {
    #[error("{0} not found in PATH")]
    BinaryNotFound(String),

    /// The executor ran and failed; `stderr` is kept verbatim for classification
    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("invalid state document for stage '{stage}': {message}")]
    InvalidState { stage: String, message: String },

    #[error("health check failed for stage '{stage}': {message}")]
    HealthCheck { stage: String, message: String },

    #[error("state backend teardown failed: {0}")]
    Backend(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] strata_core::CoreError),
}

impl IacError {
    /// Text the retry controller classifies
    pub fn detail(&self) -> String {
        match self {
            IacError::CommandFailed { stderr, .. } => stderr.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IacError>;
