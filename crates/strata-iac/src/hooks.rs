//! Pre/post health-check hooks around stage operations

use crate::error::Result;
use crate::executor::Operation;
use async_trait::async_trait;
use strata_core::Stage;

/// Checks run before and after an executor operation on a stage
///
/// A failing `before` aborts install; during clean the sequencer only logs it.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn before(&self, stage: &Stage, operation: Operation) -> Result<()>;

    async fn after(&self, stage: &Stage, operation: Operation) -> Result<()>;
}

/// Health check that always passes
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHealthCheck;

#[async_trait]
impl HealthCheck for NoopHealthCheck {
    async fn before(&self, _stage: &Stage, _operation: Operation) -> Result<()> {
        Ok(())
    }

    async fn after(&self, _stage: &Stage, _operation: Operation) -> Result<()> {
        Ok(())
    }
}
