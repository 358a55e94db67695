use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    ConfigDirNotFound,

    #[error(
        "project file not found. Looked in:\n\
        - current directory: strata.local.kdl, strata.kdl\n\
        - ./.strata/ directory\n\
        - ~/.config/strata/strata.kdl\n\
        or set STRATA_PROJECT to point at the file directly"
    )]
    ProjectFileNotFound,

    #[error("invalid settings file {path}: {message}")]
    InvalidSettings { path: PathBuf, message: String },

    #[error("invalid value file {path}: {message}")]
    InvalidValues { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
