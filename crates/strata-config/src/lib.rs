//! Project discovery and settings for strata
//!
//! - [`find_project_file`] locates the `strata.kdl` project definition
//! - [`Settings`] carries the retry, polling and cluster knobs (`strata.yaml`)
//! - [`ValueFile`] backs the `config=` and `secret=` variable sources

pub mod error;
pub mod settings;
pub mod values;

pub use error::*;
pub use settings::{
    CleanSettings, ClusterSettings, PollSettings, ReclaimSettings, Settings, TeardownSettings,
};
pub use values::ValueFile;

use std::path::{Path, PathBuf};

/// Environment variable that points directly at a project file
pub const PROJECT_ENV: &str = "STRATA_PROJECT";

/// Directory holding per-project state (`config.yaml`, `secrets.yaml`, scratch files)
pub const STATE_DIR: &str = ".strata";

const CANDIDATES: [&str; 2] = ["strata.local.kdl", "strata.kdl"];

/// Global config directory (`~/.config/strata`), created on first use
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("strata");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Locate the project file
///
/// Search order:
/// 1. `STRATA_PROJECT` environment variable
/// 2. current directory: strata.local.kdl, strata.kdl
/// 3. `./.strata/` directory, same order
/// 4. `~/.config/strata/strata.kdl`
pub fn find_project_file() -> Result<PathBuf> {
    if let Ok(project_path) = std::env::var(PROJECT_ENV) {
        let path = PathBuf::from(project_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(path = %path.display(), "{} points at a missing file", PROJECT_ENV);
    }

    let current_dir = std::env::current_dir()?;
    if let Some(path) = find_in(&current_dir) {
        return Ok(path);
    }

    let state_dir = current_dir.join(STATE_DIR);
    if state_dir.is_dir()
        && let Some(path) = find_in(&state_dir)
    {
        return Ok(path);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("strata").join("strata.kdl");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::ProjectFileNotFound)
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Project root for a discovered project file
///
/// A file inside `.strata/` belongs to the directory above it.
pub fn project_root(project_file: &Path) -> PathBuf {
    let parent = project_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    if parent.file_name().and_then(|n| n.to_str()) == Some(STATE_DIR) {
        parent.parent().map(Path::to_path_buf).unwrap_or(parent)
    } else {
        parent
    }
}
