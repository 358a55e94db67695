//! Destroy policy

use crate::error::{CoreError, Result};
use regex::Regex;

/// Match against a fully-qualified resource address
#[derive(Debug, Clone)]
pub enum AddressPattern {
    Exact(String),
    Regex(Regex),
}

impl AddressPattern {
    pub fn exact(address: impl Into<String>) -> Self {
        AddressPattern::Exact(address.into())
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(AddressPattern::Regex)
            .map_err(|e| CoreError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    pub fn matches(&self, address: &str) -> bool {
        match self {
            AddressPattern::Exact(expected) => expected == address,
            AddressPattern::Regex(re) => re.is_match(address),
        }
    }
}

impl std::fmt::Display for AddressPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressPattern::Exact(s) => write!(f, "{}", s),
            AddressPattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// How a stage is torn down
#[derive(Debug, Clone, Default)]
pub struct DestroyPolicy {
    /// Leave the stage alone during clean
    pub skip: bool,
    pub include: Vec<AddressPattern>,
    pub exclude: Vec<AddressPattern>,
    /// Pass the stage's resolved variables to destroy
    pub override_vars: bool,
}

impl DestroyPolicy {
    /// No include and no exclude patterns: destroy everything
    pub fn is_unfiltered(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Exclude wins over include; an empty include list admits everything
    pub fn admits(&self, address: &str) -> bool {
        if self.exclude.iter().any(|p| p.matches(address)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.matches(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclude_wins_over_include() {
        let policy = DestroyPolicy {
            include: vec![AddressPattern::regex(r"^aws_instance\.").unwrap()],
            exclude: vec![AddressPattern::exact("aws_instance.bastion")],
            ..Default::default()
        };

        assert!(policy.admits("aws_instance.web"));
        assert!(!policy.admits("aws_instance.bastion"));
        assert!(!policy.admits("aws_s3_bucket.logs"));
    }

    #[test]
    fn test_exclude_only_admits_the_rest() {
        let policy = DestroyPolicy {
            exclude: vec![AddressPattern::regex("bucket").unwrap()],
            ..Default::default()
        };

        assert!(!policy.is_unfiltered());
        assert!(policy.admits("aws_instance.web"));
        assert!(!policy.admits("aws_s3_bucket.logs"));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            AddressPattern::regex("(unclosed"),
            Err(CoreError::InvalidPattern { .. })
        ));
    }
}
