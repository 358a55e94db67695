use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error: {path}\nreason: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("invalid project: {0}")]
    InvalidConfig(String),

    #[error("stage '{stage}': {message}")]
    InvalidStage { stage: String, message: String },

    #[error("duplicate stage id: {0}")]
    DuplicateStage(String),

    #[error("stage not found: {0}")]
    StageNotFound(String),

    #[error("invalid address pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("1Password error: {0}")]
    OnePassword(String),

    #[error(transparent)]
    Config(#[from] strata_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
