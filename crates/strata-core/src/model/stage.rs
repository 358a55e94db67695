//! Stage definition

use super::policy::DestroyPolicy;
use super::variable::StageVariable;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One independently applied infrastructure unit
#[derive(Debug, Clone)]
pub struct Stage {
    pub id: String,
    /// Directory holding the stage's IaC unit, relative to the project root
    pub path: PathBuf,
    /// Position in the forward sequence; clean runs these in reverse
    pub order: i32,
    pub variables: BTreeMap<String, StageVariable>,
    pub destroy: DestroyPolicy,
    /// The stage talks to the cluster API (Helm releases, manifests)
    pub requires_cluster: bool,
}

impl Stage {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, order: i32) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            order,
            variables: BTreeMap::new(),
            destroy: DestroyPolicy::default(),
            requires_cluster: false,
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, variable: StageVariable) -> Self {
        self.variables.insert(name.into(), variable);
        self
    }

    pub fn with_destroy(mut self, destroy: DestroyPolicy) -> Self {
        self.destroy = destroy;
        self
    }

    pub fn with_cluster_access(mut self) -> Self {
        self.requires_cluster = true;
        self
    }

    /// Ids of the stages this one reads outputs from
    pub fn output_dependencies(&self) -> Vec<String> {
        let mut deps: Vec<String> = self
            .variables
            .values()
            .filter_map(|v| match v {
                StageVariable::StageOutput(reference) => {
                    super::OutputRef::parse(reference).map(|r| r.stage)
                }
                _ => None,
            })
            .filter(|dep| dep != &self.id)
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }
}
