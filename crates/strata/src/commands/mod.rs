pub mod clean;
pub mod install;
pub mod plan;
pub mod reclaim;
pub mod remediate;
pub mod stages;
pub mod targets;
pub mod validate;
