//! Project definition

use super::stage::Stage;
use crate::error::{CoreError, Result};
use std::path::PathBuf;

/// The managed cluster that reclamation and remediation act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTarget {
    pub name: String,
    pub region: String,
    pub kubeconfig: Option<PathBuf>,
}

/// Shared remote state backend, torn down last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub bucket: String,
    pub lock_table: Option<String>,
    pub region: String,
}

/// A staged project, stages kept in ascending `order`
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub cluster: Option<ClusterTarget>,
    pub backend: Option<BackendConfig>,
    stages: Vec<Stage>,
}

impl Project {
    /// Build a project, sorting stages by `order`
    ///
    /// Stage ids must be unique, and every stage-output reference must point
    /// at a stage with a lower order.
    pub fn new(name: impl Into<String>, stages: Vec<Stage>) -> Result<Self> {
        let mut stages = stages;
        stages.sort_by_key(|s| s.order);

        for (i, stage) in stages.iter().enumerate() {
            if stages[..i].iter().any(|s| s.id == stage.id) {
                return Err(CoreError::DuplicateStage(stage.id.clone()));
            }
        }

        for stage in &stages {
            for dep in stage.output_dependencies() {
                match stages.iter().find(|s| s.id == dep) {
                    Some(upstream) if upstream.order >= stage.order => {
                        return Err(CoreError::InvalidStage {
                            stage: stage.id.clone(),
                            message: format!(
                                "reads outputs of '{}' (order {}) which does not run before it (order {})",
                                dep, upstream.order, stage.order
                            ),
                        });
                    }
                    Some(_) => {}
                    None => {
                        tracing::warn!(
                            stage = %stage.id,
                            upstream = %dep,
                            "Stage references outputs of an unknown stage"
                        );
                    }
                }
            }
        }

        Ok(Self {
            name: name.into(),
            cluster: None,
            backend: None,
            stages,
        })
    }

    pub fn with_cluster(mut self, cluster: ClusterTarget) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn require_stage(&self, id: &str) -> Result<&Stage> {
        self.stage(id)
            .ok_or_else(|| CoreError::StageNotFound(id.to_string()))
    }

    /// Stages in install order
    pub fn forward(&self) -> impl DoubleEndedIterator<Item = &Stage> {
        self.stages.iter()
    }

    /// Stages in teardown order
    pub fn reverse(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn requires_cluster(&self) -> bool {
        self.stages.iter().any(|s| s.requires_cluster)
    }
}
