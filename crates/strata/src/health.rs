use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use strata_cluster::ClusterApi;
use strata_core::Stage;
use strata_iac::{HealthCheck, IacError, Operation};

/// Fails the pre-check of `requires-cluster` stages when the cluster does not answer
pub struct ClusterReachable {
    api: Arc<dyn ClusterApi>,
    timeout: Duration,
}

impl ClusterReachable {
    pub fn new(api: Arc<dyn ClusterApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }
}

#[async_trait]
impl HealthCheck for ClusterReachable {
    async fn before(&self, stage: &Stage, operation: Operation) -> strata_iac::Result<()> {
        if !stage.requires_cluster {
            return Ok(());
        }
        self.api
            .probe(self.timeout)
            .await
            .map_err(|e| IacError::HealthCheck {
                stage: stage.id.clone(),
                message: format!("cluster unreachable before {}: {}", operation, e),
            })
    }

    async fn after(&self, _stage: &Stage, _operation: Operation) -> strata_iac::Result<()> {
        Ok(())
    }
}
