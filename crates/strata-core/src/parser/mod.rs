//! KDL project parser
//!
//! Reads `strata.kdl`: one `project`, an optional `cluster` and `backend`,
//! and any number of `stage` nodes.

mod stage;

use stage::parse_stage;

use crate::error::{CoreError, Result};
use crate::model::{BackendConfig, ClusterTarget, Project};
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::fs;
use std::path::{Path, PathBuf};

/// Parse a project file
pub fn parse_project_file<P: AsRef<Path>>(path: P) -> Result<Project> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| CoreError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let name = strata_config::project_root(path)
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .unwrap_or_else(|| "unnamed".to_string());
    parse_project_str(&content, name)
}

/// Parse project source text
pub fn parse_project_str(content: &str, default_name: String) -> Result<Project> {
    let doc: KdlDocument = content.parse()?;

    let mut name = default_name;
    let mut cluster = None;
    let mut backend = None;
    let mut stages = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                if let Some(project_name) = first_string(node) {
                    name = project_name.to_string();
                }
            }
            "cluster" => cluster = Some(parse_cluster(node)?),
            "backend" => backend = Some(parse_backend(node)?),
            "stage" => stages.push(parse_stage(node)?),
            other => {
                tracing::debug!(node = %other, "Ignoring unknown top-level node");
            }
        }
    }

    let mut project = Project::new(name, stages)?;
    if let Some(cluster) = cluster {
        project = project.with_cluster(cluster);
    }
    if let Some(backend) = backend {
        project = project.with_backend(backend);
    }
    Ok(project)
}

fn parse_cluster(node: &KdlNode) -> Result<ClusterTarget> {
    let name = first_string(node)
        .ok_or_else(|| CoreError::InvalidConfig("cluster requires a name".to_string()))?
        .to_string();
    let region = prop_string(node, "region")
        .ok_or_else(|| CoreError::InvalidConfig(format!("cluster '{}' requires region=", name)))?
        .to_string();
    let kubeconfig = prop_string(node, "kubeconfig").map(expand_home);

    Ok(ClusterTarget {
        name,
        region,
        kubeconfig,
    })
}

fn parse_backend(node: &KdlNode) -> Result<BackendConfig> {
    let bucket = prop_string(node, "bucket")
        .ok_or_else(|| CoreError::InvalidConfig("backend requires bucket=".to_string()))?
        .to_string();
    let region = prop_string(node, "region")
        .ok_or_else(|| CoreError::InvalidConfig("backend requires region=".to_string()))?
        .to_string();

    Ok(BackendConfig {
        bucket,
        lock_table: prop_string(node, "lock-table").map(str::to_string),
        region,
    })
}

/// First positional argument as a string
pub(crate) fn first_string(node: &KdlNode) -> Option<&str> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
}

/// First positional argument as a bool; a bare flag node counts as `true`
pub(crate) fn flag(node: &KdlNode) -> bool {
    match node.entries().iter().find(|e| e.name().is_none()) {
        Some(entry) => entry.value().as_bool().unwrap_or(false),
        None => true,
    }
}

pub(crate) fn prop<'a>(node: &'a KdlNode, key: &str) -> Option<&'a KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_some_and(|n| n.value() == key))
        .map(|e| e.value())
}

pub(crate) fn prop_string<'a>(node: &'a KdlNode, key: &str) -> Option<&'a str> {
    prop(node, key).and_then(|v| v.as_string())
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
