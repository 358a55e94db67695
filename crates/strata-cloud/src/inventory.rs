//! Cloud inventory abstraction

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which cluster's resources to reclaim, and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimScope {
    pub cluster_id: String,
    pub region: String,
}

impl ReclaimScope {
    pub fn new(cluster_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            region: region.into(),
        }
    }
}

/// A live cloud resource found by tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedResource {
    pub id: String,
    /// Value of the cluster ownership tag (`owned`, `shared`, or the cluster id)
    pub owner_tag: String,
    /// Provider status string (`in-use`, `available`, `running`, ...)
    pub status: String,
}

impl TaggedResource {
    pub fn new(
        id: impl Into<String>,
        owner_tag: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_tag: owner_tag.into(),
            status: status.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub resource: TaggedResource,
    pub attachment_id: Option<String>,
    /// Managed by another service; never force-detached
    pub requester_managed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceStatus {
    InUse,
    Available,
}

impl InterfaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceStatus::InUse => "in-use",
            InterfaceStatus::Available => "available",
        }
    }
}

/// Independent ways of finding a cluster's security groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupCriterion {
    /// Tagged with the cluster ownership tag
    ClusterOwned,
    /// Tagged by the load-balancer controller
    LoadBalancerController,
    /// Backend groups matched by naming convention
    BackendNaming,
}

impl GroupCriterion {
    pub const ALL: [GroupCriterion; 3] = [
        GroupCriterion::ClusterOwned,
        GroupCriterion::LoadBalancerController,
        GroupCriterion::BackendNaming,
    ];
}

impl std::fmt::Display for GroupCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupCriterion::ClusterOwned => write!(f, "cluster-owned"),
            GroupCriterion::LoadBalancerController => write!(f, "load-balancer-controller"),
            GroupCriterion::BackendNaming => write!(f, "backend-naming"),
        }
    }
}

/// Tag-filtered list and delete calls against the cloud account
///
/// Deletes are idempotent: implementations report an already-missing
/// resource as `Ok(())`.
#[async_trait]
pub trait CloudInventory: Send + Sync {
    /// Load balancers tagged with the cluster id
    async fn list_load_balancers(&self, scope: &ReclaimScope) -> Result<Vec<TaggedResource>>;

    async fn delete_load_balancer(&self, scope: &ReclaimScope, id: &str) -> Result<()>;

    /// Cluster-owned or shared instances that are not terminated
    async fn list_instances(&self, scope: &ReclaimScope) -> Result<Vec<TaggedResource>>;

    async fn terminate_instances(&self, scope: &ReclaimScope, ids: &[String]) -> Result<()>;

    async fn list_network_interfaces(
        &self,
        scope: &ReclaimScope,
        status: InterfaceStatus,
    ) -> Result<Vec<NetworkInterface>>;

    async fn detach_network_interface(&self, scope: &ReclaimScope, attachment_id: &str)
    -> Result<()>;

    async fn delete_network_interface(&self, scope: &ReclaimScope, id: &str) -> Result<()>;

    async fn list_security_groups(
        &self,
        scope: &ReclaimScope,
        criterion: GroupCriterion,
    ) -> Result<Vec<TaggedResource>>;

    /// Remove every ingress and egress rule
    async fn revoke_security_group_rules(&self, scope: &ReclaimScope, id: &str) -> Result<()>;

    async fn delete_security_group(&self, scope: &ReclaimScope, id: &str) -> Result<()>;
}
