//! Teardown retry and escalation controller
//!
//! ```text
//! Attempt(n) ─ok─▶ Success
//!     │
//!     └─err─▶ classify ─fatal─▶ Abort
//!                 │
//!             retryable ─▶ escalate (each kind once) ─▶ wait ─▶ Attempt(n+1)
//! ```

use crate::classify::{RetryableErrorClass, classify_error};
use crate::error::{LifecycleError, Result};
use crate::escalation::{CloudReclaimer, ClusterRemediator, reclaim_outcome, remediation_outcome};
use crate::timing::TimingReport;
use std::future::Future;
use std::time::{Duration, Instant};
use strata_config::TeardownSettings;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&TeardownSettings::default())
    }
}

impl From<&TeardownSettings> for RetryPolicy {
    fn from(settings: &TeardownSettings) -> Self {
        Self::new(settings.max_retries, settings.retry_delay())
    }
}

/// Escalations already spent on the current stage
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EscalationState {
    pub cluster_remediation_run: bool,
    pub cloud_reclamation_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownOutcome {
    pub attempts: u32,
    pub escalation: EscalationState,
}

pub struct TeardownController<'a> {
    policy: RetryPolicy,
    remediator: Option<&'a dyn ClusterRemediator>,
    reclaimer: Option<&'a dyn CloudReclaimer>,
    cancel: &'a CancellationToken,
}

impl<'a> TeardownController<'a> {
    pub fn new(policy: RetryPolicy, cancel: &'a CancellationToken) -> Self {
        Self {
            policy,
            remediator: None,
            reclaimer: None,
            cancel,
        }
    }

    pub fn with_remediator(mut self, remediator: Option<&'a dyn ClusterRemediator>) -> Self {
        self.remediator = remediator;
        self
    }

    pub fn with_reclaimer(mut self, reclaimer: Option<&'a dyn CloudReclaimer>) -> Self {
        self.reclaimer = reclaimer;
        self
    }

    /// Destroy one stage, retrying retryable failures
    ///
    /// `destroy` receives the zero-based attempt number. Escalation state is
    /// fresh for every call.
    pub async fn run<F, Fut>(
        &self,
        stage: &str,
        timing: &mut TimingReport,
        mut destroy: F,
    ) -> Result<TeardownOutcome>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = strata_iac::Result<()>>,
    {
        let mut escalation = EscalationState::default();
        let mut attempt = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(LifecycleError::Cancelled);
            }

            tracing::info!(stage, attempt = attempt + 1, "Destroying stage");
            let error = match destroy(attempt).await {
                Ok(()) => {
                    return Ok(TeardownOutcome {
                        attempts: attempt + 1,
                        escalation,
                    });
                }
                Err(e) => e,
            };

            let class = classify_error(&error);
            if !class.is_retryable() {
                tracing::error!(stage, error = %error, "Destroy failed with a non-retryable error");
                return Err(LifecycleError::TeardownFailed {
                    stage: stage.to_string(),
                    attempts: attempt + 1,
                    class,
                    source: error,
                });
            }
            if attempt >= self.policy.max_retries {
                tracing::error!(
                    stage,
                    attempts = attempt + 1,
                    error = %error,
                    "Destroy still failing, giving up"
                );
                return Err(LifecycleError::TeardownFailed {
                    stage: stage.to_string(),
                    attempts: attempt + 1,
                    class,
                    source: error,
                });
            }

            tracing::warn!(stage, attempt = attempt + 1, %class, error = %error, "Retryable destroy failure");
            self.escalate(stage, class, &mut escalation, timing).await;

            tracing::info!(stage, delay_secs = self.policy.delay.as_secs(), "Waiting before retry");
            tokio::select! {
                _ = tokio::time::sleep(self.policy.delay) => {}
                _ = self.cancel.cancelled() => return Err(LifecycleError::Cancelled),
            }
            attempt += 1;
        }
    }

    async fn escalate(
        &self,
        stage: &str,
        class: RetryableErrorClass,
        state: &mut EscalationState,
        timing: &mut TimingReport,
    ) {
        if class.is_cluster_layer() && !state.cluster_remediation_run {
            state.cluster_remediation_run = true;
            let phase = format!("escalate:remediate:{}", stage);
            match self.remediator {
                Some(remediator) => {
                    let started = Instant::now();
                    let report = remediator.remediate().await;
                    tracing::info!(stage, "Cluster remediation: {}", report);
                    timing.record(phase, started.elapsed(), remediation_outcome(&report));
                }
                None => timing.skipped(phase, "no cluster configured"),
            }
        }

        if !state.cloud_reclamation_run {
            state.cloud_reclamation_run = true;
            let phase = format!("escalate:reclaim:{}", stage);
            match self.reclaimer {
                Some(reclaimer) => {
                    let started = Instant::now();
                    let report = reclaimer.reclaim().await;
                    tracing::info!(stage, "Cloud reclamation: {}", report);
                    timing.record(phase, started.elapsed(), reclaim_outcome(&report));
                }
                None => timing.skipped(phase, "no cloud scope configured"),
            }
        }
    }
}
