//! Cluster blocker remediation
//!
//! Must run before any instance is terminated, while the control plane can
//! still process deletions.

use crate::api::{API_SERVICE, ClusterApi, MUTATING_WEBHOOKS, TERMINATING, VALIDATING_WEBHOOKS};
use std::sync::Arc;
use strata_config::ClusterSettings;

/// What one remediation pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemediationReport {
    /// Why nothing was done, when a precondition failed
    pub skipped: Option<String>,
    pub webhook_kinds_cleared: Vec<String>,
    pub api_services_deleted: Vec<String>,
    pub namespaces_finalized: Vec<String>,
    pub warnings: Vec<String>,
}

impl RemediationReport {
    fn skip(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::info!("Skipping cluster remediation: {}", reason);
        Self {
            skipped: Some(reason),
            ..Default::default()
        }
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn ran(&self) -> bool {
        self.skipped.is_none()
    }
}

impl std::fmt::Display for RemediationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(reason) = &self.skipped {
            return write!(f, "skipped ({})", reason);
        }
        write!(
            f,
            "{} webhook kind(s), {} API service(s), {} namespace(s) finalized",
            self.webhook_kinds_cleared.len(),
            self.api_services_deleted.len(),
            self.namespaces_finalized.len()
        )?;
        if !self.warnings.is_empty() {
            write!(f, ", {} warning(s)", self.warnings.len())?;
        }
        Ok(())
    }
}

pub struct Remediation {
    api: Arc<dyn ClusterApi>,
    settings: ClusterSettings,
}

impl Remediation {
    pub fn new(api: Arc<dyn ClusterApi>, settings: ClusterSettings) -> Self {
        Self { api, settings }
    }

    /// Remove cluster-side teardown blockers; never fails
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> RemediationReport {
        if !self.api.credentials_present() {
            return RemediationReport::skip("no cluster credentials file");
        }
        if !self.api.cli_available().await {
            return RemediationReport::skip("cluster CLI not found");
        }
        if let Err(e) = self.api.probe(self.settings.probe_timeout()).await {
            return RemediationReport::skip(format!("cluster unreachable: {}", e));
        }

        let mut report = RemediationReport::default();
        tracing::info!("Removing cluster teardown blockers");

        // the whole cluster is going away, so every webhook goes
        for kind in [VALIDATING_WEBHOOKS, MUTATING_WEBHOOKS] {
            match self.api.delete_all(kind).await {
                Ok(()) => report.webhook_kinds_cleared.push(kind.to_string()),
                Err(e) => report.warn(format!("delete {}: {}", kind, e)),
            }
        }

        for name in &self.settings.stale_api_services {
            match self.api.delete(API_SERVICE, name).await {
                Ok(()) => report.api_services_deleted.push(name.clone()),
                Err(e) => report.warn(format!("delete apiservice {}: {}", name, e)),
            }
        }

        for namespace in &self.settings.stuck_namespaces {
            match self.api.namespace_phase(namespace).await {
                Ok(Some(phase)) if phase == TERMINATING => {
                    match self.api.clear_namespace_finalizers(namespace).await {
                        Ok(()) => {
                            tracing::info!(namespace = %namespace, "Cleared finalizers");
                            report.namespaces_finalized.push(namespace.clone());
                        }
                        Err(e) => {
                            report.warn(format!("finalize namespace {}: {}", namespace, e))
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => report.warn(format!("inspect namespace {}: {}", namespace, e)),
            }
        }

        tracing::info!("Cluster remediation finished: {}", report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClusterError, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeCluster {
        credentials: bool,
        cli: bool,
        reachable: bool,
        phases: HashMap<String, String>,
        failing_kind: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl Default for FakeCluster {
        fn default() -> Self {
            Self {
                credentials: true,
                cli: true,
                reachable: true,
                phases: HashMap::new(),
                failing_kind: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl FakeCluster {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ClusterApi for FakeCluster {
        fn credentials_present(&self) -> bool {
            self.credentials
        }

        async fn cli_available(&self) -> bool {
            self.cli
        }

        async fn probe(&self, timeout: Duration) -> Result<()> {
            if self.reachable {
                Ok(())
            } else {
                Err(ClusterError::Timeout(timeout))
            }
        }

        async fn delete_all(&self, kind: &str) -> Result<()> {
            self.record(format!("delete-all {}", kind));
            if self.failing_kind == Some(VALIDATING_WEBHOOKS) && kind == VALIDATING_WEBHOOKS {
                return Err(ClusterError::CommandFailed {
                    command: "kubectl delete".to_string(),
                    stderr: "forbidden".to_string(),
                });
            }
            Ok(())
        }

        async fn delete(&self, kind: &str, name: &str) -> Result<()> {
            self.record(format!("delete {} {}", kind, name));
            Ok(())
        }

        async fn namespace_phase(&self, namespace: &str) -> Result<Option<String>> {
            Ok(self.phases.get(namespace).cloned())
        }

        async fn clear_namespace_finalizers(&self, namespace: &str) -> Result<()> {
            self.record(format!("finalize {}", namespace));
            Ok(())
        }
    }

    fn settings() -> ClusterSettings {
        ClusterSettings {
            stale_api_services: vec!["v1beta1.metrics.k8s.io".to_string()],
            stuck_namespaces: vec![
                "cert-manager".to_string(),
                "monitoring".to_string(),
                "argocd".to_string(),
            ],
            ..Default::default()
        }
    }

    async fn run(cluster: FakeCluster) -> (RemediationReport, Arc<FakeCluster>) {
        let cluster = Arc::new(cluster);
        let report = Remediation::new(cluster.clone(), settings()).run().await;
        (report, cluster)
    }

    #[tokio::test]
    async fn test_full_pass() {
        let (report, cluster) = run(FakeCluster {
            phases: HashMap::from([
                ("cert-manager".to_string(), "Terminating".to_string()),
                ("monitoring".to_string(), "Active".to_string()),
            ]),
            ..Default::default()
        })
        .await;

        assert!(report.ran());
        assert_eq!(
            cluster.calls(),
            vec![
                "delete-all validatingwebhookconfigurations",
                "delete-all mutatingwebhookconfigurations",
                "delete apiservice v1beta1.metrics.k8s.io",
                "finalize cert-manager",
            ]
        );
        assert_eq!(report.namespaces_finalized, vec!["cert-manager"]);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_skipped_when_preconditions_fail() {
        for cluster in [
            FakeCluster {
                credentials: false,
                ..Default::default()
            },
            FakeCluster {
                cli: false,
                ..Default::default()
            },
            FakeCluster {
                reachable: false,
                ..Default::default()
            },
        ] {
            let (report, cluster) = run(cluster).await;
            assert!(!report.ran());
            assert!(cluster.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn test_failures_are_warnings() {
        let (report, cluster) = run(FakeCluster {
            failing_kind: Some(VALIDATING_WEBHOOKS),
            ..Default::default()
        })
        .await;

        assert!(report.ran());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.webhook_kinds_cleared, vec![MUTATING_WEBHOOKS]);
        assert!(cluster.calls().contains(&"delete apiservice v1beta1.metrics.k8s.io".to_string()));
    }
}
