//! Secret store
//!
//! Secrets live in `.strata/secrets.yaml`. A value may be an `op://` reference,
//! which is resolved through the 1Password CLI on lookup:
//!
//! ```text
//! op://Vault/Item/Field
//! op://Vault/Item/Section/Field
//! ```
//!
//! Resolved values are never logged.

use crate::error::{CoreError, Result};
use crate::lookup::KeyLookup;
use std::process::Command;
use strata_config::ValueFile;
use tracing::debug;

const OP_PREFIX: &str = "op://";

/// Whether the 1Password CLI is installed
pub fn is_available() -> bool {
    Command::new("op")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

pub fn is_op_reference(value: &str) -> bool {
    value.starts_with(OP_PREFIX)
}

/// Resolve an `op://` reference with `op read`
pub fn resolve_reference(reference: &str) -> Result<String> {
    if !is_op_reference(reference) {
        return Err(CoreError::OnePassword(format!(
            "invalid reference (must start with {}): {}",
            OP_PREFIX, reference
        )));
    }

    debug!(reference = %reference, "Resolving 1Password reference");

    let mut cmd = Command::new("op");
    cmd.arg("read").arg(reference);

    if let Ok(account) = std::env::var("OP_ACCOUNT") {
        cmd.arg("--account").arg(account);
    }

    let output = cmd
        .output()
        .map_err(|e| CoreError::OnePassword(format!("failed to run op: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let hint = if stderr.contains("not signed in") || stderr.contains("session expired") {
            "\nhint: run `op signin` or set OP_SERVICE_ACCOUNT_TOKEN"
        } else if stderr.contains("multiple accounts") {
            "\nhint: set OP_ACCOUNT to pick an account"
        } else {
            ""
        };

        return Err(CoreError::OnePassword(format!(
            "could not read {}: {}{}",
            reference,
            stderr.trim(),
            hint
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Secret values backed by a value file
pub struct SecretStore {
    values: ValueFile,
}

impl SecretStore {
    pub fn new(values: ValueFile) -> Self {
        Self { values }
    }

    pub fn empty() -> Self {
        Self::new(ValueFile::empty())
    }
}

impl KeyLookup for SecretStore {
    fn lookup(&self, key: &str) -> Result<Option<String>> {
        match self.values.lookup(key) {
            Some(value) if is_op_reference(&value) => resolve_reference(&value).map(Some),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_op_reference() {
        assert!(is_op_reference("op://Vault/Item/Field"));
        assert!(!is_op_reference("https://example.com"));
        assert!(!is_op_reference(""));
    }

    #[test]
    fn test_resolve_reference_invalid() {
        let err = resolve_reference("not-a-reference").unwrap_err();
        assert!(err.to_string().contains("op://"));
    }

    #[test]
    fn test_plain_secret_lookup() {
        let values = ValueFile::from_yaml("db:\n  password: hunter2\n").unwrap();
        let store = SecretStore::new(values);
        assert_eq!(
            store.lookup("db.password").unwrap(),
            Some("hunter2".to_string())
        );
        assert_eq!(store.lookup("db.user").unwrap(), None);
    }

    #[test]
    #[ignore = "requires 1Password CLI and authentication"]
    fn test_op_secret_lookup() {
        let values = ValueFile::from_yaml("db:\n  password: op://Infra/db/password\n").unwrap();
        let store = SecretStore::new(values);
        assert!(store.lookup("db.password").unwrap().is_some());
    }
}
