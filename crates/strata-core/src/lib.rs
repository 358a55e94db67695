//! strata core
//!
//! Data model for a staged infrastructure project and the KDL parser that
//! loads it. Stages are loaded once per invocation and never mutated.

pub mod error;
pub mod lookup;
pub mod model;
pub mod parser;
pub mod secret;

pub use error::{CoreError, Result};
pub use lookup::KeyLookup;
pub use model::*;
pub use parser::{parse_project_file, parse_project_str};
pub use secret::SecretStore;
