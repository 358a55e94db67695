//! Destroy target selection
//!
//! Decides what a stage's destroy should touch:
//!
//! - no include/exclude patterns: full destroy, no state read at all
//! - no state or no resources: skip the destroy entirely
//! - otherwise: the filtered, deduplicated addresses, or skip when none remain

use crate::error::Result;
use crate::executor::IacExecutor;
use crate::state::StateTree;
use std::collections::HashSet;
use strata_core::{DestroyPolicy, Stage};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyPlan {
    /// Unfiltered destroy of the whole stage
    Full,
    /// Destroy only these addresses
    Targeted(Vec<String>),
    /// Nothing to destroy; not a failure
    Bypass,
}

impl DestroyPlan {
    pub fn should_destroy(&self) -> bool {
        !matches!(self, DestroyPlan::Bypass)
    }

    /// `None` for a full destroy or a bypass
    pub fn targets(&self) -> Option<&[String]> {
        match self {
            DestroyPlan::Targeted(targets) => Some(targets),
            _ => None,
        }
    }
}

/// Compute the destroy plan for a stage, reading its state through the executor
pub async fn targets_to_destroy(executor: &dyn IacExecutor, stage: &Stage) -> Result<DestroyPlan> {
    if stage.destroy.is_unfiltered() {
        debug!(stage = %stage.id, "No destroy filters, destroying everything");
        return Ok(DestroyPlan::Full);
    }

    let state = executor.show(stage).await?;
    let plan = select_destroy_targets(&stage.destroy, state.as_ref());
    match &plan {
        DestroyPlan::Targeted(targets) => {
            info!(stage = %stage.id, count = targets.len(), "Selected destroy targets");
        }
        DestroyPlan::Bypass => {
            info!(stage = %stage.id, "Nothing left to destroy after filtering");
        }
        DestroyPlan::Full => {}
    }
    Ok(plan)
}

/// Pure selection over an already-fetched state tree
pub fn select_destroy_targets(policy: &DestroyPolicy, state: Option<&StateTree>) -> DestroyPlan {
    if policy.is_unfiltered() {
        return DestroyPlan::Full;
    }

    let Some(state) = state.filter(|s| !s.is_empty()) else {
        return DestroyPlan::Bypass;
    };

    let mut seen = HashSet::new();
    let targets: Vec<String> = state
        .addresses()
        .into_iter()
        .filter(|address| policy.admits(address))
        .filter(|address| seen.insert(address.clone()))
        .collect();

    if targets.is_empty() {
        DestroyPlan::Bypass
    } else {
        DestroyPlan::Targeted(targets)
    }
}
