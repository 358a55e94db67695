//! AWS support for strata
//!
//! Everything goes through the `aws` CLI, so credentials, profiles and SSO
//! behave exactly as they do in the operator's shell.
//!
//! - [`AwsCli`] implements [`strata_cloud::CloudInventory`] over elbv2 and ec2
//! - [`AwsStateBackend`] removes the S3 state bucket and DynamoDB lock table

pub mod backend;
pub mod cli;
pub mod inventory;
pub mod tags;

pub use backend::AwsStateBackend;
pub use cli::AwsCli;
