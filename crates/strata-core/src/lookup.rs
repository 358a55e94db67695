//! Flat key lookup shared by the config and secret variable sources

use crate::error::Result;
use std::collections::HashMap;
use strata_config::ValueFile;

/// Dotted-path key/value source
///
/// `Ok(None)` means the key is absent; callers treat that as "no value",
/// never as a failure.
pub trait KeyLookup: Send + Sync {
    fn lookup(&self, key: &str) -> Result<Option<String>>;
}

impl KeyLookup for ValueFile {
    fn lookup(&self, key: &str) -> Result<Option<String>> {
        Ok(ValueFile::lookup(self, key))
    }
}

impl KeyLookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key).filter(|v| !v.is_empty()).cloned())
    }
}
