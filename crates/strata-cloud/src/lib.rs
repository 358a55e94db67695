//! strata cloud reclamation
//!
//! Deletes cluster-owned cloud resources by tag, outside of IaC state, to
//! unblock a stuck teardown.
//!
//! ```text
//! load balancers → instances → network interfaces → security groups
//! ```
//!
//! Every phase is best-effort: failures are logged and the next phase runs.
//! The cloud account itself is reached through [`CloudInventory`].

pub mod error;
pub mod inventory;
pub mod reclaim;
pub mod wait;

pub use error::{CloudError, Result};
pub use inventory::{
    CloudInventory, GroupCriterion, InterfaceStatus, NetworkInterface, ReclaimScope,
    TaggedResource,
};
pub use reclaim::{ReclaimReport, ReclamationEngine, dedupe_groups};
pub use wait::{PollPolicy, WaitOutcome, pause, poll_until};
