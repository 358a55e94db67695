//! Idempotent one-time actions, keyed by name

use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;

/// Remembers which named actions already succeeded
///
/// Owned by one orchestrator; a failed action is not marked and may run again.
#[derive(Debug, Default)]
pub struct RunOnce {
    done: Mutex<HashSet<String>>,
}

impl RunOnce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_run(&self, key: &str) -> bool {
        self.done
            .lock()
            .map(|done| done.contains(key))
            .unwrap_or(false)
    }

    /// Run `action` unless `key` already succeeded; returns whether it ran
    pub async fn run<F, Fut, E>(&self, key: &str, action: F) -> Result<bool, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        if self.has_run(key) {
            tracing::debug!(action = key, "Already done");
            return Ok(false);
        }
        action().await?;
        if let Ok(mut done) = self.done.lock() {
            done.insert(key.to_string());
        }
        Ok(true)
    }
}
