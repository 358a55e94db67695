//! strata lifecycle
//!
//! Sequences stage operations for a whole project:
//!
//! - install: shared variables, then init/apply per stage in ascending order
//! - clean: cluster remediation, optional proactive reclaim, refresh, then
//!   destroy in descending order through [`TeardownController`], finishing
//!   with the state backend and local scratch files
//!
//! Destroy failures are classified ([`classify`]) and retryable ones escalate
//! to cluster remediation and cloud reclamation, each at most once per stage.

pub mod classify;
pub mod controller;
pub mod error;
pub mod escalation;
pub mod run_once;
pub mod sequencer;
pub mod timing;
pub mod workspace;

pub use classify::{RetryableErrorClass, classify, classify_error};
pub use controller::{EscalationState, RetryPolicy, TeardownController, TeardownOutcome};
pub use error::{LifecycleError, Result};
pub use escalation::{CloudReclaimer, ClusterRemediator};
pub use run_once::RunOnce;
pub use sequencer::{Orchestrator, RunReport};
pub use timing::{PhaseOutcome, PhaseTiming, TimingReport};
