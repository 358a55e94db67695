//! Run settings (`strata.yaml`)
//!
//! Every field has a default, so a missing file or a partial file is fine.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE: &str = "strata.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub teardown: TeardownSettings,
    pub reclaim: ReclaimSettings,
    pub cluster: ClusterSettings,
    pub clean: CleanSettings,
}

impl Settings {
    /// Load `strata.yaml` from the project root, falling back to defaults
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(SETTINGS_FILE);
        if !path.exists() {
            tracing::debug!("No {} found, using default settings", SETTINGS_FILE);
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|e| ConfigError::InvalidSettings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Stage-destroy retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeardownSettings {
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for TeardownSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_secs: 60,
        }
    }
}

impl TeardownSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Fixed-attempt polling bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    pub attempts: u32,
    pub interval_secs: u64,
}

impl PollSettings {
    pub const fn new(attempts: u32, interval_secs: u64) -> Self {
        Self {
            attempts,
            interval_secs,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Cloud reclamation bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReclaimSettings {
    pub load_balancer_poll: PollSettings,
    pub instance_poll: PollSettings,
    pub interface_settle_secs: u64,
    /// Upper bound on a single wait, whatever the attempt count says
    pub phase_deadline_secs: u64,
}

impl Default for ReclaimSettings {
    fn default() -> Self {
        Self {
            load_balancer_poll: PollSettings::new(12, 10),
            instance_poll: PollSettings::new(30, 10),
            interface_settle_secs: 15,
            phase_deadline_secs: 600,
        }
    }
}

impl ReclaimSettings {
    pub fn interface_settle(&self) -> Duration {
        Duration::from_secs(self.interface_settle_secs)
    }

    pub fn phase_deadline(&self) -> Duration {
        Duration::from_secs(self.phase_deadline_secs)
    }
}

/// Cluster remediation knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    /// Overrides the kubeconfig declared in the project file
    pub kubeconfig: Option<PathBuf>,
    pub probe_timeout_secs: u64,
    pub stale_api_services: Vec<String>,
    pub stuck_namespaces: Vec<String>,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            probe_timeout_secs: 10,
            stale_api_services: vec![
                "v1beta1.metrics.k8s.io".to_string(),
                "v1beta1.custom.metrics.k8s.io".to_string(),
                "v1beta1.external.metrics.k8s.io".to_string(),
            ],
            stuck_namespaces: vec![
                "cert-manager".to_string(),
                "ingress-nginx".to_string(),
                "monitoring".to_string(),
                "external-dns".to_string(),
                "karpenter".to_string(),
                "argocd".to_string(),
            ],
        }
    }
}

impl ClusterSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// `clean` behaviour switches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanSettings {
    pub refresh: bool,
    pub proactive_reclaim: bool,
}

impl Default for CleanSettings {
    fn default() -> Self {
        Self {
            refresh: true,
            proactive_reclaim: true,
        }
    }
}
