//! Cancellable fixed-interval polling
//!
//! Bounded by an attempt count, an interval, and an overall deadline. The
//! cancellation token is checked at every sleep boundary.

use crate::error::{CloudError, Result};
use std::future::Future;
use std::time::Duration;
use strata_config::PollSettings;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
    pub deadline: Duration,
}

impl PollPolicy {
    pub fn new(attempts: u32, interval: Duration, deadline: Duration) -> Self {
        Self {
            attempts,
            interval,
            deadline,
        }
    }

    pub fn from_settings(settings: PollSettings, deadline: Duration) -> Self {
        Self::new(settings.attempts, settings.interval(), deadline)
    }
}

/// How a poll ended
#[derive(Debug)]
pub enum WaitOutcome {
    Ready { attempts: u32 },
    /// Attempts or deadline ran out before the condition held
    Exhausted { attempts: u32 },
    /// The check itself failed
    Failed(CloudError),
    Cancelled,
}

impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready { .. })
    }
}

/// Sleep for `duration` unless cancelled first
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        _ = cancel.cancelled() => Err(CloudError::Cancelled),
    }
}

/// Run `check` until it returns `Ok(true)`
///
/// Sleeps `interval` between checks; never sleeps past the deadline.
pub async fn poll_until<F, Fut>(
    policy: PollPolicy,
    cancel: &CancellationToken,
    what: &str,
    mut check: F,
) -> WaitOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    while attempts < policy.attempts {
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        attempts += 1;

        match check().await {
            Ok(true) => {
                tracing::debug!(resource = what, attempts, "Condition met");
                return WaitOutcome::Ready { attempts };
            }
            Ok(false) => {}
            Err(e) => return WaitOutcome::Failed(e),
        }

        if attempts == policy.attempts {
            break;
        }
        let remaining = policy.deadline.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            tracing::debug!(resource = what, attempts, "Poll deadline reached");
            break;
        }

        tracing::debug!(
            resource = what,
            attempt = attempts,
            max_attempts = policy.attempts,
            "Not yet, waiting"
        );
        if pause(policy.interval.min(remaining), cancel).await.is_err() {
            return WaitOutcome::Cancelled;
        }
    }

    WaitOutcome::Exhausted { attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(attempts: u32) -> PollPolicy {
        PollPolicy::new(attempts, Duration::from_secs(10), Duration::from_secs(600))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_some_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let cancel = CancellationToken::new();

        let outcome = poll_until(policy(12), &cancel, "lb", move || async move {
            Ok(calls.fetch_add(1, Ordering::SeqCst) >= 2)
        })
        .await;

        assert!(matches!(outcome, WaitOutcome::Ready { attempts: 3 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempt_budget() {
        let cancel = CancellationToken::new();
        let outcome = poll_until(policy(4), &cancel, "lb", || async { Ok(false) }).await;
        assert!(matches!(outcome, WaitOutcome::Exhausted { attempts: 4 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_caps_attempts() {
        let cancel = CancellationToken::new();
        let policy = PollPolicy::new(30, Duration::from_secs(10), Duration::from_secs(25));

        let started = Instant::now();
        let outcome = poll_until(policy, &cancel, "instances", || async { Ok(false) }).await;

        assert!(matches!(outcome, WaitOutcome::Exhausted { attempts: 4 }));
        assert!(started.elapsed() <= Duration::from_secs(25));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_failure_is_reported() {
        let cancel = CancellationToken::new();
        let outcome = poll_until(policy(5), &cancel, "instances", || async {
            Err(CloudError::Cancelled)
        })
        .await;
        assert!(matches!(outcome, WaitOutcome::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_between_polls() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let outcome = poll_until(policy(12), &cancel, "lb", || {
            calls.fetch_add(1, Ordering::SeqCst);
            cancel.cancel();
            async { Ok(false) }
        })
        .await;

        assert!(matches!(outcome, WaitOutcome::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pause_returns_on_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = pause(Duration::from_secs(3600), &cancel).await;
        assert!(matches!(result, Err(CloudError::Cancelled)));
    }
}
