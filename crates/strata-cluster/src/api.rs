//! Cluster API abstraction

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub const VALIDATING_WEBHOOKS: &str = "validatingwebhookconfigurations";
pub const MUTATING_WEBHOOKS: &str = "mutatingwebhookconfigurations";
pub const API_SERVICE: &str = "apiservice";

/// Namespace phase reported while deletion is pending
pub const TERMINATING: &str = "Terminating";

/// The cluster operations remediation needs
///
/// Deletes ignore "not found".
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// A credentials file exists where the client will look for it
    fn credentials_present(&self) -> bool;

    async fn cli_available(&self) -> bool;

    /// Lightweight connectivity check, bounded by `timeout`
    async fn probe(&self, timeout: Duration) -> Result<()>;

    /// Delete every cluster-scoped object of `kind`
    async fn delete_all(&self, kind: &str) -> Result<()>;

    async fn delete(&self, kind: &str, name: &str) -> Result<()>;

    /// `None` when the namespace does not exist
    async fn namespace_phase(&self, namespace: &str) -> Result<Option<String>>;

    /// Empty both the metadata and spec finalizer lists
    async fn clear_namespace_finalizers(&self, namespace: &str) -> Result<()>;
}
