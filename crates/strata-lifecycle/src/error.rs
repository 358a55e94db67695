//! Lifecycle error types

use crate::classify::RetryableErrorClass;
use strata_iac::{IacError, Operation};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("stage '{stage}' {operation} failed: {source}")]
    StageFailed {
        stage: String,
        operation: Operation,
        #[source]
        source: IacError,
    },

    /// The last destroy error, after a fatal classification or exhausted retries
    #[error("stage '{stage}' destroy failed after {attempts} attempt(s): {source}")]
    TeardownFailed {
        stage: String,
        attempts: u32,
        class: RetryableErrorClass,
        #[source]
        source: IacError,
    },

    #[error("health check before {operation} of stage '{stage}' failed: {message}")]
    HealthCheck {
        stage: String,
        operation: Operation,
        message: String,
    },

    #[error("Cancelled")]
    Cancelled,

    #[error(transparent)]
    Iac(#[from] IacError),

    #[error(transparent)]
    Core(#[from] strata_core::CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
