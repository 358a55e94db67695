//! YAML value files with dotted-path lookup
//!
//! Backs `.strata/config.yaml` and `.strata/secrets.yaml`:
//!
//! ```yaml
//! dns:
//!   domain: example.com
//! ```
//!
//! `lookup("dns.domain")` returns `Some("example.com")`.

use crate::error::{ConfigError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ValueFile {
    path: Option<PathBuf>,
    root: Value,
}

impl ValueFile {
    /// An empty store; every lookup misses
    pub fn empty() -> Self {
        Self {
            path: None,
            root: Value::Null,
        }
    }

    /// Load a value file; a missing file yields an empty store
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Value file not found, using empty store");
            return Ok(Self {
                path: Some(path.to_path_buf()),
                root: Value::Null,
            });
        }

        let content = std::fs::read_to_string(path)?;
        let root = Self::parse(&content).map_err(|message| ConfigError::InvalidValues {
            path: path.to_path_buf(),
            message,
        })?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            root,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let root = Self::parse(content).map_err(|message| ConfigError::InvalidValues {
            path: PathBuf::from("<inline>"),
            message,
        })?;
        Ok(Self { path: None, root })
    }

    fn parse(content: &str) -> std::result::Result<Value, String> {
        if content.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up a dotted path
    ///
    /// Scalars come back unquoted; maps and sequences come back as JSON text.
    /// Null and empty strings count as missing.
    pub fn lookup(&self, dotted: &str) -> Option<String> {
        let mut current = &self.root;
        for segment in dotted.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        match current {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
dns:
  domain: example.com
  ttl: 300
cluster:
  zones: [a, b]
  empty: ""
flag: true
"#;

    #[test]
    fn test_nested_lookup() {
        let values = ValueFile::from_yaml(SAMPLE).unwrap();
        assert_eq!(values.lookup("dns.domain"), Some("example.com".to_string()));
        assert_eq!(values.lookup("dns.ttl"), Some("300".to_string()));
        assert_eq!(values.lookup("flag"), Some("true".to_string()));
        assert_eq!(values.lookup("cluster.zones.1"), Some("b".to_string()));
    }

    #[test]
    fn test_missing_and_empty_values() {
        let values = ValueFile::from_yaml(SAMPLE).unwrap();
        assert_eq!(values.lookup("dns.missing"), None);
        assert_eq!(values.lookup("dns.domain.deeper"), None);
        assert_eq!(values.lookup("cluster.empty"), None);
    }

    #[test]
    fn test_composite_values_render_as_json() {
        let values = ValueFile::from_yaml(SAMPLE).unwrap();
        assert_eq!(values.lookup("cluster.zones"), Some(r#"["a","b"]"#.to_string()));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let values = ValueFile::load(&temp_dir.path().join("config.yaml")).unwrap();
        assert_eq!(values.lookup("anything"), None);
    }
}
