//! Destroy failure classification
//!
//! Case-insensitive substring match over an ordered table; the first row that
//! matches decides. Anything unmatched is fatal.

use strata_iac::IacError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryableErrorClass {
    DependencyViolation,
    ResourceInUse,
    ClusterUnreachable,
    ReleaseManagementFailure,
    NonRetryable,
}

impl RetryableErrorClass {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RetryableErrorClass::NonRetryable)
    }

    /// Failures rooted in the cluster or its release manager
    pub fn is_cluster_layer(&self) -> bool {
        matches!(
            self,
            RetryableErrorClass::ClusterUnreachable | RetryableErrorClass::ReleaseManagementFailure
        )
    }
}

impl std::fmt::Display for RetryableErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RetryableErrorClass::DependencyViolation => "dependency violation",
            RetryableErrorClass::ResourceInUse => "resource in use",
            RetryableErrorClass::ClusterUnreachable => "cluster unreachable",
            RetryableErrorClass::ReleaseManagementFailure => "release management failure",
            RetryableErrorClass::NonRetryable => "non-retryable",
        };
        f.write_str(name)
    }
}

/// Lowercase signature, class
const SIGNATURES: &[(&str, RetryableErrorClass)] = &[
    ("dependencyviolation", RetryableErrorClass::DependencyViolation),
    ("has a dependent object", RetryableErrorClass::DependencyViolation),
    ("networkinterfaceinuse", RetryableErrorClass::ResourceInUse),
    ("invalidnetworkinterface.inuse", RetryableErrorClass::ResourceInUse),
    ("network interface is currently in use", RetryableErrorClass::ResourceInUse),
    ("securitygroupinuse", RetryableErrorClass::ResourceInUse),
    ("resourceinuse", RetryableErrorClass::ResourceInUse),
    ("failed to delete release", RetryableErrorClass::ReleaseManagementFailure),
    ("uninstallation completed with", RetryableErrorClass::ReleaseManagementFailure),
    ("kubernetes cluster unreachable", RetryableErrorClass::ClusterUnreachable),
    ("cluster unreachable", RetryableErrorClass::ClusterUnreachable),
    ("connection refused", RetryableErrorClass::ClusterUnreachable),
    ("no endpoints available", RetryableErrorClass::ClusterUnreachable),
    ("i/o timeout", RetryableErrorClass::ClusterUnreachable),
];

pub fn classify(message: &str) -> RetryableErrorClass {
    let message = message.to_lowercase();
    SIGNATURES
        .iter()
        .find(|(signature, _)| message.contains(signature))
        .map(|(_, class)| *class)
        .unwrap_or(RetryableErrorClass::NonRetryable)
}

/// Classify an executor error by its captured output
pub fn classify_error(error: &IacError) -> RetryableErrorClass {
    classify(&error.detail())
}
