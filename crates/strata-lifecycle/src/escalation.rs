//! Out-of-band cleanup the retry controller can escalate to

use crate::timing::PhaseOutcome;
use async_trait::async_trait;
use strata_cloud::{ReclaimReport, ReclamationEngine};
use strata_cluster::{Remediation, RemediationReport};

/// Cluster-side blocker removal; never fails
#[async_trait]
pub trait ClusterRemediator: Send + Sync {
    async fn remediate(&self) -> RemediationReport;
}

/// Tag-driven cloud cleanup; never fails
#[async_trait]
pub trait CloudReclaimer: Send + Sync {
    async fn reclaim(&self) -> ReclaimReport;

    /// Whether known blockers exist; a failed check reads as `false`
    async fn probe_blockers(&self) -> bool;
}

#[async_trait]
impl ClusterRemediator for Remediation {
    async fn remediate(&self) -> RemediationReport {
        self.run().await
    }
}

#[async_trait]
impl CloudReclaimer for ReclamationEngine {
    async fn reclaim(&self) -> ReclaimReport {
        ReclamationEngine::reclaim(self).await
    }

    async fn probe_blockers(&self) -> bool {
        ReclamationEngine::probe_blockers(self).await
    }
}

/// Timing outcome of a remediation pass
pub fn remediation_outcome(report: &RemediationReport) -> PhaseOutcome {
    match &report.skipped {
        Some(reason) => PhaseOutcome::Skipped(reason.clone()),
        None => warnings_outcome(report.warnings.len()),
    }
}

/// Timing outcome of a reclamation pass
pub fn reclaim_outcome(report: &ReclaimReport) -> PhaseOutcome {
    if report.cancelled {
        return PhaseOutcome::Skipped("cancelled".to_string());
    }
    warnings_outcome(report.warnings.len())
}

fn warnings_outcome(count: usize) -> PhaseOutcome {
    if count == 0 {
        PhaseOutcome::Ok
    } else {
        PhaseOutcome::Failed(format!("{} warning(s)", count))
    }
}
