//! Cloud resource reclamation engine
//!
//! Four phases in a fixed order, each easing the dependencies of the next:
//! load balancers, instances, network interfaces, security groups. Nothing
//! here reads or writes IaC state.

use crate::error::{CloudError, Result};
use crate::inventory::{
    CloudInventory, GroupCriterion, InterfaceStatus, ReclaimScope, TaggedResource,
};
use crate::wait::{PollPolicy, WaitOutcome, pause, poll_until};
use std::collections::BTreeSet;
use std::sync::Arc;
use strata_config::ReclaimSettings;
use tokio_util::sync::CancellationToken;

/// What one reclamation pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReclaimReport {
    pub load_balancers_deleted: usize,
    pub instances_terminated: usize,
    pub interfaces_detached: usize,
    pub interfaces_skipped: usize,
    pub interfaces_deleted: usize,
    pub security_groups_deleted: usize,
    /// Best-effort failures, one line each
    pub warnings: Vec<String>,
    pub cancelled: bool,
}

impl ReclaimReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && !self.cancelled
    }

    fn warn(&mut self, phase: &str, message: impl std::fmt::Display) {
        tracing::warn!(phase, "{}", message);
        self.warnings.push(format!("{}: {}", phase, message));
    }
}

impl std::fmt::Display for ReclaimReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} load balancer(s), {} instance(s), {} interface(s) detached / {} deleted, {} security group(s)",
            self.load_balancers_deleted,
            self.instances_terminated,
            self.interfaces_detached,
            self.interfaces_deleted,
            self.security_groups_deleted
        )?;
        if !self.warnings.is_empty() {
            write!(f, ", {} warning(s)", self.warnings.len())?;
        }
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// Union of independently discovered group sets, without duplicates
pub fn dedupe_groups<I>(sets: I) -> Vec<String>
where
    I: IntoIterator<Item = Vec<TaggedResource>>,
{
    sets.into_iter()
        .flatten()
        .map(|group| group.id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub struct ReclamationEngine {
    inventory: Arc<dyn CloudInventory>,
    scope: ReclaimScope,
    settings: ReclaimSettings,
    cancel: CancellationToken,
}

impl ReclamationEngine {
    pub fn new(
        inventory: Arc<dyn CloudInventory>,
        scope: ReclaimScope,
        settings: ReclaimSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inventory,
            scope,
            settings,
            cancel,
        }
    }

    pub fn scope(&self) -> &ReclaimScope {
        &self.scope
    }

    /// Run all four phases; never fails, problems land in the report
    #[tracing::instrument(skip(self), fields(cluster = %self.scope.cluster_id, region = %self.scope.region))]
    pub async fn reclaim(&self) -> ReclaimReport {
        let mut report = ReclaimReport::default();
        tracing::info!("Reclaiming cloud resources");

        let phases: [Phase; 4] = [
            Phase::LoadBalancers,
            Phase::Instances,
            Phase::NetworkInterfaces,
            Phase::SecurityGroups,
        ];
        for phase in phases {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let result = match phase {
                Phase::LoadBalancers => self.load_balancers(&mut report).await,
                Phase::Instances => self.instances(&mut report).await,
                Phase::NetworkInterfaces => self.network_interfaces(&mut report).await,
                Phase::SecurityGroups => self.security_groups(&mut report).await,
            };
            match result {
                Ok(()) => {}
                Err(CloudError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => report.warn(phase.name(), e),
            }
        }

        tracing::info!("Reclamation finished: {}", report);
        report
    }

    /// Whether anything known to block a destroy is still around
    ///
    /// A failed check counts as "nothing found".
    pub async fn probe_blockers(&self) -> bool {
        match self.find_blockers().await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "Blocker probe failed, assuming none");
                false
            }
        }
    }

    async fn find_blockers(&self) -> Result<bool> {
        let interfaces = self
            .inventory
            .list_network_interfaces(&self.scope, InterfaceStatus::InUse)
            .await?;
        let in_use = interfaces.iter().filter(|eni| !eni.requester_managed).count();
        let load_balancers = self.inventory.list_load_balancers(&self.scope).await?.len();

        if in_use > 0 || load_balancers > 0 {
            tracing::info!(
                interfaces = in_use,
                load_balancers,
                "Found resources likely to block teardown"
            );
            return Ok(true);
        }
        Ok(false)
    }

    fn policy(&self, phase: Phase) -> PollPolicy {
        let poll = match phase {
            Phase::Instances => self.settings.instance_poll,
            _ => self.settings.load_balancer_poll,
        };
        PollPolicy::from_settings(poll, self.settings.phase_deadline())
    }

    async fn load_balancers(&self, report: &mut ReclaimReport) -> Result<()> {
        let found = self.inventory.list_load_balancers(&self.scope).await?;
        if found.is_empty() {
            tracing::debug!("No tagged load balancers");
            return Ok(());
        }

        for lb in &found {
            match self.inventory.delete_load_balancer(&self.scope, &lb.id).await {
                Ok(()) => report.load_balancers_deleted += 1,
                Err(e) => report.warn("load-balancers", format!("delete {}: {}", lb.id, e)),
            }
        }

        let inventory = self.inventory.as_ref();
        let scope = &self.scope;
        let outcome = poll_until(
            self.policy(Phase::LoadBalancers),
            &self.cancel,
            "load balancers",
            move || async move {
                inventory
                    .list_load_balancers(scope)
                    .await
                    .map(|lbs| lbs.is_empty())
            },
        )
        .await;

        match outcome {
            WaitOutcome::Ready { .. } => Ok(()),
            WaitOutcome::Cancelled => Err(CloudError::Cancelled),
            WaitOutcome::Exhausted { attempts } => {
                tracing::warn!(attempts, "Load balancers still present, moving on");
                Ok(())
            }
            WaitOutcome::Failed(e) => {
                report.warn("load-balancers", format!("status check: {}", e));
                Ok(())
            }
        }
    }

    async fn instances(&self, report: &mut ReclaimReport) -> Result<()> {
        let found = self.inventory.list_instances(&self.scope).await?;
        if found.is_empty() {
            tracing::debug!("No cluster instances");
            return Ok(());
        }

        let ids: Vec<String> = found.into_iter().map(|i| i.id).collect();
        tracing::info!(count = ids.len(), "Terminating instances");
        self.inventory.terminate_instances(&self.scope, &ids).await?;
        report.instances_terminated += ids.len();

        let inventory = self.inventory.as_ref();
        let scope = &self.scope;
        let outcome = poll_until(
            self.policy(Phase::Instances),
            &self.cancel,
            "instances",
            move || async move {
                inventory
                    .list_instances(scope)
                    .await
                    .map(|instances| instances.is_empty())
            },
        )
        .await;

        match outcome {
            WaitOutcome::Ready { .. } => Ok(()),
            WaitOutcome::Cancelled => Err(CloudError::Cancelled),
            WaitOutcome::Exhausted { attempts } => {
                tracing::warn!(attempts, "Instances still shutting down, moving on");
                Ok(())
            }
            // instances can vanish entirely mid-poll
            WaitOutcome::Failed(e) => {
                tracing::debug!(error = %e, "Instance query failed, treating as terminated");
                Ok(())
            }
        }
    }

    async fn network_interfaces(&self, report: &mut ReclaimReport) -> Result<()> {
        let in_use = self
            .inventory
            .list_network_interfaces(&self.scope, InterfaceStatus::InUse)
            .await?;

        let mut detached = 0;
        for eni in &in_use {
            if eni.requester_managed {
                tracing::debug!(eni = %eni.resource.id, "Requester-managed, leaving attached");
                report.interfaces_skipped += 1;
                continue;
            }
            let Some(attachment) = eni.attachment_id.as_deref() else {
                continue;
            };
            match self
                .inventory
                .detach_network_interface(&self.scope, attachment)
                .await
            {
                Ok(()) => detached += 1,
                Err(e) => report.warn(
                    "network-interfaces",
                    format!("detach {}: {}", eni.resource.id, e),
                ),
            }
        }
        report.interfaces_detached += detached;

        if detached > 0 {
            pause(self.settings.interface_settle(), &self.cancel).await?;
        }

        let available = self
            .inventory
            .list_network_interfaces(&self.scope, InterfaceStatus::Available)
            .await?;
        for eni in &available {
            match self
                .inventory
                .delete_network_interface(&self.scope, &eni.resource.id)
                .await
            {
                Ok(()) => report.interfaces_deleted += 1,
                Err(e) => report.warn(
                    "network-interfaces",
                    format!("delete {}: {}", eni.resource.id, e),
                ),
            }
        }
        Ok(())
    }

    async fn security_groups(&self, report: &mut ReclaimReport) -> Result<()> {
        let mut sets = Vec::with_capacity(GroupCriterion::ALL.len());
        for criterion in GroupCriterion::ALL {
            match self
                .inventory
                .list_security_groups(&self.scope, criterion)
                .await
            {
                Ok(groups) => sets.push(groups),
                Err(e) => report.warn("security-groups", format!("list {}: {}", criterion, e)),
            }
        }

        let groups = dedupe_groups(sets);
        if groups.is_empty() {
            tracing::debug!("No cluster security groups");
            return Ok(());
        }

        // groups reference each other, so clear every rule before any delete
        for id in &groups {
            if let Err(e) = self
                .inventory
                .revoke_security_group_rules(&self.scope, id)
                .await
            {
                report.warn("security-groups", format!("revoke {}: {}", id, e));
            }
        }
        for id in &groups {
            match self.inventory.delete_security_group(&self.scope, id).await {
                Ok(()) => report.security_groups_deleted += 1,
                Err(e) => report.warn("security-groups", format!("delete {}: {}", id, e)),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    LoadBalancers,
    Instances,
    NetworkInterfaces,
    SecurityGroups,
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::LoadBalancers => "load-balancers",
            Phase::Instances => "instances",
            Phase::NetworkInterfaces => "network-interfaces",
            Phase::SecurityGroups => "security-groups",
        }
    }
}
