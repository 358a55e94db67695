//! strata cluster remediation
//!
//! Clears the cluster-side objects that wedge a teardown: admission webhooks
//! whose backends are already gone, stale aggregated APIs, and namespaces
//! stuck in `Terminating`.
//!
//! [`Remediation::run`] never fails; when the cluster cannot be reached it
//! logs why and does nothing.

pub mod api;
pub mod error;
pub mod kubectl;
pub mod remediation;

pub use api::ClusterApi;
pub use error::{ClusterError, Result};
pub use kubectl::Kubectl;
pub use remediation::{Remediation, RemediationReport};
