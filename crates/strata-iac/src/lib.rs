//! strata IaC integration
//!
//! The executor is consumed as an opaque command interface ([`IacExecutor`]);
//! [`Terraform`] implements it over the `terraform` CLI.
//!
//! On top of it sit the two pieces every executor call needs:
//!
//! - [`VariableResolver`] turns a stage's declared inputs into `key=value`
//!   bindings, fetching other stages' outputs on demand
//! - [`select_destroy_targets`] decides what a destroy should touch, if anything

pub mod backend;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod state;
pub mod targets;
pub mod terraform;
pub mod variables;

pub use backend::{NoBackend, StateBackend};
pub use error::{IacError, Result};
pub use executor::{IacExecutor, Operation, OutputBundle, VarBinding};
pub use hooks::{HealthCheck, NoopHealthCheck};
pub use state::{StateModule, StateResource, StateTree};
pub use targets::{DestroyPlan, select_destroy_targets, targets_to_destroy};
pub use terraform::Terraform;
pub use variables::{StageOutputCache, VariableResolver};
