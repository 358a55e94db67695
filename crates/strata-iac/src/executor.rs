//! Executor abstraction

use crate::error::Result;
use crate::state::StateTree;
use async_trait::async_trait;
use std::collections::BTreeMap;
use strata_core::Stage;

/// Output bundle of a stage: output name to its JSON value
pub type OutputBundle = BTreeMap<String, serde_json::Value>;

/// One resolved `key=value` input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBinding {
    pub key: String,
    pub value: String,
}

impl VarBinding {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for VarBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Executor operations, as reported to health-check hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    Plan,
    Apply,
    Destroy,
    Refresh,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Init => write!(f, "init"),
            Operation::Plan => write!(f, "plan"),
            Operation::Apply => write!(f, "apply"),
            Operation::Destroy => write!(f, "destroy"),
            Operation::Refresh => write!(f, "refresh"),
        }
    }
}

/// The infrastructure-as-code executor, one call per stage operation
#[async_trait]
pub trait IacExecutor: Send + Sync {
    async fn init(&self, stage: &Stage) -> Result<()>;

    /// Returns the human-readable plan
    async fn plan(&self, stage: &Stage, vars: &[VarBinding]) -> Result<String>;

    async fn apply(&self, stage: &Stage, vars: &[VarBinding]) -> Result<()>;

    /// `targets` empty means a full destroy
    async fn destroy(&self, stage: &Stage, vars: &[VarBinding], targets: &[String]) -> Result<()>;

    async fn refresh(&self, stage: &Stage, vars: &[VarBinding]) -> Result<()>;

    async fn output(&self, stage: &Stage) -> Result<OutputBundle>;

    /// Current state tree, `None` when the stage has no state yet
    async fn show(&self, stage: &Stage) -> Result<Option<StateTree>>;
}
