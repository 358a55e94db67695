//! Cluster error types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("{0} not found in PATH")]
    BinaryNotFound(String),

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("cluster did not answer within {0:?}")]
    Timeout(Duration),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
