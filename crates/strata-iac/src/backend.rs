//! Shared state backend

use crate::error::Result;
use async_trait::async_trait;

/// Remote state storage shared by every stage, torn down after the last destroy
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Short description for logs and the timing summary
    fn describe(&self) -> String;

    /// Remove the backend; already-missing pieces count as removed
    async fn teardown(&self) -> Result<()>;
}

/// Project without a remote backend
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBackend;

#[async_trait]
impl StateBackend for NoBackend {
    fn describe(&self) -> String {
        "local state".to_string()
    }

    async fn teardown(&self) -> Result<()> {
        tracing::debug!("No remote state backend configured");
        Ok(())
    }
}
