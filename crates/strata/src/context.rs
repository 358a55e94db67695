//! Project loading and collaborator wiring shared by the commands

use crate::health::ClusterReachable;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_cloud::{ReclaimScope, ReclamationEngine};
use strata_cloud_aws::{AwsCli, AwsStateBackend};
use strata_cluster::{Kubectl, Remediation};
use strata_config::{STATE_DIR, Settings, ValueFile};
use strata_core::{KeyLookup, Project, SecretStore};
use strata_iac::Terraform;
use strata_lifecycle::Orchestrator;
use strata_lifecycle::workspace::shared_vars_path;
use tokio_util::sync::CancellationToken;

const CONFIG_VALUES: &str = "config.yaml";
const SECRET_VALUES: &str = "secrets.yaml";

pub struct Context {
    pub project_file: PathBuf,
    pub root: PathBuf,
    pub project: Project,
    pub settings: Settings,
}

impl Context {
    pub fn load(project_file: Option<&Path>) -> anyhow::Result<Self> {
        let project_file = match project_file {
            Some(path) => path.to_path_buf(),
            None => strata_config::find_project_file()?,
        };
        let root = strata_config::project_root(&project_file);
        let project = strata_core::parse_project_file(&project_file)?;
        let settings = Settings::load(&root)?;
        tracing::debug!(
            project = %project.name,
            file = %project_file.display(),
            stages = project.len(),
            "Loaded project"
        );

        Ok(Self {
            project_file,
            root,
            project,
            settings,
        })
    }

    fn kubectl(&self) -> Option<Kubectl> {
        let cluster = self.project.cluster.as_ref()?;
        let kubeconfig = self
            .settings
            .cluster
            .kubeconfig
            .clone()
            .or_else(|| cluster.kubeconfig.clone());
        Some(match kubeconfig {
            Some(path) => Kubectl::new().with_kubeconfig(path),
            None => Kubectl::new(),
        })
    }

    /// `None` when the project declares no cluster
    pub fn remediation(&self) -> Option<Remediation> {
        let kubectl = self.kubectl()?;
        Some(Remediation::new(
            Arc::new(kubectl),
            self.settings.cluster.clone(),
        ))
    }

    /// `None` when the project declares no cluster
    pub fn reclamation(&self, cancel: CancellationToken) -> Option<ReclamationEngine> {
        let cluster = self.project.cluster.as_ref()?;
        Some(ReclamationEngine::new(
            Arc::new(AwsCli::new()),
            ReclaimScope::new(&cluster.name, &cluster.region),
            self.settings.reclaim.clone(),
            cancel,
        ))
    }

    /// Wire an orchestrator for this project
    pub fn orchestrator(&self, cancel: CancellationToken) -> anyhow::Result<Orchestrator> {
        let state_dir = self.root.join(STATE_DIR);
        let config: Arc<dyn KeyLookup> = Arc::new(ValueFile::load(&state_dir.join(CONFIG_VALUES))?);
        let secrets: Arc<dyn KeyLookup> = Arc::new(SecretStore::new(ValueFile::load(
            &state_dir.join(SECRET_VALUES),
        )?));

        let terraform =
            Terraform::new(&self.root).with_shared_var_file(shared_vars_path(&self.root));

        let mut orchestrator =
            Orchestrator::new(self.project.clone(), &self.root, Arc::new(terraform))
                .with_settings(self.settings.clone())
                .with_values(config, secrets)
                .with_cancellation(cancel.clone());

        if let Some(backend) = &self.project.backend {
            let backend = AwsStateBackend::new(AwsCli::new(), backend.clone());
            orchestrator = orchestrator.with_backend(Arc::new(backend));
        }
        if let Some(kubectl) = self.kubectl() {
            orchestrator = orchestrator.with_health_check(Arc::new(ClusterReachable::new(
                Arc::new(kubectl),
                self.settings.cluster.probe_timeout(),
            )));
        }
        if let Some(remediation) = self.remediation() {
            orchestrator = orchestrator.with_remediator(Arc::new(remediation));
        }
        if let Some(engine) = self.reclamation(cancel) {
            orchestrator = orchestrator.with_reclaimer(Arc::new(engine));
        }
        Ok(orchestrator)
    }
}
