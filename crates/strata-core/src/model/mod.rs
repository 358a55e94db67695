//! Model definitions
//!
//! A [`Project`] is an ordered set of [`Stage`]s plus the cluster and state
//! backend they share.

mod policy;
mod project;
mod stage;
mod variable;

pub use policy::*;
pub use project::*;
pub use stage::*;
pub use variable::*;
