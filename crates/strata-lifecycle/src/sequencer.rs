//! Stage sequencer
//!
//! Install walks stages in ascending order and stops at the first failure.
//! Clean remediates the cluster, optionally reclaims known blockers, inits and
//! refreshes in ascending order, destroys in descending order through the retry
//! controller, then removes the state backend and local scratch files.

use crate::controller::{RetryPolicy, TeardownController};
use crate::error::{LifecycleError, Result};
use crate::escalation::{CloudReclaimer, ClusterRemediator, reclaim_outcome, remediation_outcome};
use crate::timing::{PhaseOutcome, TimingReport};
use crate::workspace;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use strata_config::Settings;
use strata_core::{KeyLookup, Project, Stage};
use strata_iac::{
    DestroyPlan, HealthCheck, IacExecutor, NoBackend, NoopHealthCheck, Operation, StateBackend,
    VarBinding, VariableResolver, targets_to_destroy,
};
use tokio_util::sync::CancellationToken;

const SHARED_VARS_ACTION: &str = "write-shared-vars";

/// Result of an install or clean, with the timing summary kept either way
#[derive(Debug)]
pub struct RunReport {
    pub timing: TimingReport,
    pub result: Result<()>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<()> {
        self.result
    }
}

pub struct Orchestrator {
    project: Project,
    root: PathBuf,
    settings: Settings,
    executor: Arc<dyn IacExecutor>,
    config: Arc<dyn KeyLookup>,
    secrets: Arc<dyn KeyLookup>,
    health: Arc<dyn HealthCheck>,
    backend: Arc<dyn StateBackend>,
    remediator: Option<Arc<dyn ClusterRemediator>>,
    reclaimer: Option<Arc<dyn CloudReclaimer>>,
    run_once: crate::RunOnce,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(project: Project, root: impl Into<PathBuf>, executor: Arc<dyn IacExecutor>) -> Self {
        let empty: Arc<dyn KeyLookup> = Arc::new(HashMap::<String, String>::new());
        Self {
            project,
            root: root.into(),
            settings: Settings::default(),
            executor,
            config: empty.clone(),
            secrets: empty,
            health: Arc::new(NoopHealthCheck),
            backend: Arc::new(NoBackend),
            remediator: None,
            reclaimer: None,
            run_once: crate::RunOnce::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Sources for `config=` and `secret=` variables
    pub fn with_values(mut self, config: Arc<dyn KeyLookup>, secrets: Arc<dyn KeyLookup>) -> Self {
        self.config = config;
        self.secrets = secrets;
        self
    }

    pub fn with_health_check(mut self, health: Arc<dyn HealthCheck>) -> Self {
        self.health = health;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn StateBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_remediator(mut self, remediator: Arc<dyn ClusterRemediator>) -> Self {
        self.remediator = Some(remediator);
        self
    }

    pub fn with_reclaimer(mut self, reclaimer: Arc<dyn CloudReclaimer>) -> Self {
        self.reclaimer = Some(reclaimer);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn resolver(&self) -> VariableResolver<'_> {
        VariableResolver::new(
            &self.project,
            self.executor.as_ref(),
            self.config.as_ref(),
            self.secrets.as_ref(),
        )
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(LifecycleError::Cancelled);
        }
        Ok(())
    }

    /// Write the shared variable file, once per orchestrator
    async fn ensure_shared_vars(&self) -> Result<()> {
        let root = &self.root;
        let project = &self.project;
        self.run_once
            .run(SHARED_VARS_ACTION, || async move {
                workspace::write_shared_vars(root, project).await.map(|_| ())
            })
            .await?;
        Ok(())
    }

    async fn before(&self, stage: &Stage, operation: Operation) -> Result<()> {
        self.health
            .before(stage, operation)
            .await
            .map_err(|e| LifecycleError::HealthCheck {
                stage: stage.id.clone(),
                operation,
                message: e.to_string(),
            })
    }

    async fn after(&self, stage: &Stage, operation: Operation) {
        if let Err(e) = self.health.after(stage, operation).await {
            tracing::warn!(stage = %stage.id, %operation, error = %e, "Post-check failed");
        }
    }

    /// Init and apply every stage in ascending order
    #[tracing::instrument(skip(self), fields(project = %self.project.name))]
    pub async fn install(&self) -> RunReport {
        let mut timing = TimingReport::new();
        let result = self.install_stages(&mut timing).await;
        match &result {
            Ok(()) => tracing::info!("Install complete"),
            Err(e) => tracing::error!(error = %e, "Install aborted"),
        }
        RunReport { timing, result }
    }

    async fn install_stages(&self, timing: &mut TimingReport) -> Result<()> {
        self.ensure_shared_vars().await?;

        for stage in self.project.forward() {
            self.check_cancelled()?;
            tracing::info!(stage = %stage.id, order = stage.order, "Installing stage");

            self.before(stage, Operation::Init).await?;
            timing
                .measure(format!("init:{}", stage.id), self.executor.init(stage))
                .await
                .map_err(|source| LifecycleError::StageFailed {
                    stage: stage.id.clone(),
                    operation: Operation::Init,
                    source,
                })?;
            self.after(stage, Operation::Init).await;

            let vars = self.resolver().resolve(stage).await?;

            self.before(stage, Operation::Apply).await?;
            timing
                .measure(format!("apply:{}", stage.id), self.executor.apply(stage, &vars))
                .await
                .map_err(|source| LifecycleError::StageFailed {
                    stage: stage.id.clone(),
                    operation: Operation::Apply,
                    source,
                })?;
            self.after(stage, Operation::Apply).await;
        }
        Ok(())
    }

    /// Init a stage and return its plan
    pub async fn plan(&self, stage_id: &str) -> Result<String> {
        let stage = self.project.require_stage(stage_id)?;
        self.ensure_shared_vars().await?;
        self.executor.init(stage).await?;
        let vars = self.resolver().resolve(stage).await?;
        Ok(self.executor.plan(stage, &vars).await?)
    }

    /// The destroy-target selection for one stage
    pub async fn targets(&self, stage_id: &str) -> Result<DestroyPlan> {
        let stage = self.project.require_stage(stage_id)?;
        Ok(targets_to_destroy(self.executor.as_ref(), stage).await?)
    }

    /// Tear everything down in descending order
    #[tracing::instrument(skip(self), fields(project = %self.project.name))]
    pub async fn clean(&self) -> RunReport {
        let mut timing = TimingReport::new();
        let result = self.clean_stages(&mut timing).await;
        match &result {
            Ok(()) => tracing::info!("Teardown complete"),
            Err(e) => {
                tracing::error!(error = %e, "Teardown aborted");
                let reason = match e {
                    LifecycleError::Cancelled => "cancelled",
                    _ => "teardown aborted",
                };
                for phase in ["backend", "cleanup"] {
                    if timing.phase(phase).is_none() {
                        timing.skipped(phase, reason);
                    }
                }
            }
        }
        RunReport { timing, result }
    }

    async fn clean_stages(&self, timing: &mut TimingReport) -> Result<()> {
        self.ensure_shared_vars().await?;

        self.remediate_up_front(timing).await;
        self.check_cancelled()?;

        self.probe_and_reclaim(timing).await;
        self.check_cancelled()?;

        self.init_all(timing).await?;

        if self.settings.clean.refresh {
            self.refresh_all(timing).await?;
        } else {
            timing.skipped("refresh", "disabled");
        }

        let policy = RetryPolicy::from(&self.settings.teardown);
        let controller = TeardownController::new(policy, &self.cancel)
            .with_remediator(self.remediator.as_deref())
            .with_reclaimer(self.reclaimer.as_deref());

        for stage in self.project.reverse() {
            self.check_cancelled()?;
            self.destroy_stage(stage, &controller, timing).await?;
        }

        let started = Instant::now();
        let outcome = match self.backend.teardown().await {
            Ok(()) => PhaseOutcome::Ok,
            Err(e) => {
                tracing::warn!(
                    backend = %self.backend.describe(),
                    error = %e,
                    "State backend teardown failed"
                );
                PhaseOutcome::Failed(e.to_string())
            }
        };
        timing.record("backend", started.elapsed(), outcome);

        let started = Instant::now();
        let outcome = match workspace::cleanup_local(&self.root, &self.project).await {
            Ok(removed) => {
                tracing::debug!(removed = removed.len(), "Local cleanup done");
                PhaseOutcome::Ok
            }
            Err(e) => {
                tracing::warn!(error = %e, "Local cleanup failed");
                PhaseOutcome::Failed(e.to_string())
            }
        };
        timing.record("cleanup", started.elapsed(), outcome);

        Ok(())
    }

    async fn remediate_up_front(&self, timing: &mut TimingReport) {
        let Some(remediator) = &self.remediator else {
            timing.skipped("remediate", "no cluster configured");
            return;
        };
        let started = Instant::now();
        let report = remediator.remediate().await;
        timing.record("remediate", started.elapsed(), remediation_outcome(&report));
    }

    async fn probe_and_reclaim(&self, timing: &mut TimingReport) {
        let Some(reclaimer) = &self.reclaimer else {
            timing.skipped("probe", "no cloud scope configured");
            return;
        };
        if !self.settings.clean.proactive_reclaim {
            timing.skipped("probe", "disabled");
            return;
        }

        let started = Instant::now();
        let blocked = reclaimer.probe_blockers().await;
        timing.record("probe", started.elapsed(), PhaseOutcome::Ok);
        if !blocked {
            return;
        }

        tracing::info!("Known blockers found, reclaiming before destroy");
        let started = Instant::now();
        let report = reclaimer.reclaim().await;
        timing.record("reclaim", started.elapsed(), reclaim_outcome(&report));
    }

    /// Init every stage that will be destroyed, in ascending order
    ///
    /// Refresh and destroy need initialized working directories; a failure is fatal.
    async fn init_all(&self, timing: &mut TimingReport) -> Result<()> {
        for stage in self.project.forward() {
            self.check_cancelled()?;
            if stage.destroy.skip {
                timing.skipped(format!("init:{}", stage.id), "destroy skipped");
                continue;
            }
            timing
                .measure(format!("init:{}", stage.id), self.executor.init(stage))
                .await
                .map_err(|source| LifecycleError::StageFailed {
                    stage: stage.id.clone(),
                    operation: Operation::Init,
                    source,
                })?;
        }
        Ok(())
    }

    /// Refresh in ascending order; failures are logged only
    async fn refresh_all(&self, timing: &mut TimingReport) -> Result<()> {
        for stage in self.project.forward() {
            self.check_cancelled()?;
            let phase = format!("refresh:{}", stage.id);
            if stage.destroy.skip {
                timing.skipped(phase, "destroy skipped");
                continue;
            }

            let started = Instant::now();
            let result = match self.resolver().resolve(stage).await {
                Ok(vars) => self.executor.refresh(stage, &vars).await,
                Err(e) => Err(e),
            };
            let outcome = match result {
                Ok(()) => PhaseOutcome::Ok,
                Err(e) => {
                    tracing::warn!(stage = %stage.id, error = %e, "Refresh failed, continuing");
                    PhaseOutcome::Failed(e.to_string())
                }
            };
            timing.record(phase, started.elapsed(), outcome);
        }
        Ok(())
    }

    async fn destroy_stage(
        &self,
        stage: &Stage,
        controller: &TeardownController<'_>,
        timing: &mut TimingReport,
    ) -> Result<()> {
        let phase = format!("destroy:{}", stage.id);
        if stage.destroy.skip {
            tracing::info!(stage = %stage.id, "Destroy skipped by policy");
            timing.skipped(phase, "skip");
            return Ok(());
        }

        let started = Instant::now();
        let plan = match targets_to_destroy(self.executor.as_ref(), stage).await {
            Ok(plan) => plan,
            Err(source) => {
                timing.record(&phase, started.elapsed(), PhaseOutcome::Failed(source.to_string()));
                return Err(LifecycleError::StageFailed {
                    stage: stage.id.clone(),
                    operation: Operation::Destroy,
                    source,
                });
            }
        };
        if !plan.should_destroy() {
            tracing::info!(stage = %stage.id, "Nothing to destroy");
            timing.skipped(phase, "nothing to destroy");
            return Ok(());
        }

        let vars: Vec<VarBinding> = if stage.destroy.override_vars {
            self.resolver().resolve(stage).await?
        } else {
            Vec::new()
        };
        let targets: &[String] = plan.targets().unwrap_or(&[]);
        if !targets.is_empty() {
            tracing::info!(stage = %stage.id, targets = targets.len(), "Targeted destroy");
        }

        if let Err(e) = self.before(stage, Operation::Destroy).await {
            tracing::warn!(stage = %stage.id, error = %e, "Pre-check failed, destroying anyway");
        }

        let executor = self.executor.as_ref();
        let vars = vars.as_slice();
        let result = controller
            .run(&stage.id, timing, move |_| executor.destroy(stage, vars, targets))
            .await;

        let outcome = match &result {
            Ok(outcome) if outcome.attempts > 1 => {
                tracing::info!(
                    stage = %stage.id,
                    attempts = outcome.attempts,
                    "Destroyed after retries"
                );
                PhaseOutcome::Ok
            }
            Ok(_) => PhaseOutcome::Ok,
            Err(e) => PhaseOutcome::Failed(e.to_string()),
        };
        timing.record(phase, started.elapsed(), outcome);
        result?;

        self.after(stage, Operation::Destroy).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use strata_cloud::ReclaimReport;
    use strata_cluster::RemediationReport;
    use strata_config::TeardownSettings;
    use strata_core::{AddressPattern, DestroyPolicy, StageVariable};
    use strata_iac::{IacError, OutputBundle, StateTree};

    /// Records every call as `<op>:<stage>`; destroy answers come from a script
    #[derive(Default)]
    struct FakeExecutor {
        calls: Mutex<Vec<String>>,
        destroy_vars: Mutex<Vec<(String, Vec<VarBinding>)>>,
        destroy_failures: Mutex<HashMap<String, Vec<String>>>,
        failing_applies: HashSet<String>,
        failing_inits: HashSet<String>,
    }

    impl FakeExecutor {
        fn failing_destroy(self, stage: &str, stderr: &[&str]) -> Self {
            self.destroy_failures.lock().unwrap().insert(
                stage.to_string(),
                stderr.iter().map(|s| s.to_string()).collect(),
            );
            self
        }

        fn failing_apply(mut self, stage: &str) -> Self {
            self.failing_applies.insert(stage.to_string());
            self
        }

        fn failing_init(mut self, stage: &str) -> Self {
            self.failing_inits.insert(stage.to_string());
            self
        }

        fn record(&self, op: &str, stage: &Stage) {
            self.calls.lock().unwrap().push(format!("{}:{}", op, stage.id));
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_for(&self, op: &str) -> Vec<String> {
            let prefix = format!("{}:", op);
            self.calls()
                .into_iter()
                .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
                .collect()
        }
    }

    fn failure(stderr: &str) -> IacError {
        IacError::CommandFailed {
            command: "terraform".to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[async_trait]
    impl IacExecutor for FakeExecutor {
        async fn init(&self, stage: &Stage) -> strata_iac::Result<()> {
            self.record("init", stage);
            if self.failing_inits.contains(&stage.id) {
                return Err(failure("Error: Backend initialization required"));
            }
            Ok(())
        }

        async fn plan(&self, stage: &Stage, _vars: &[VarBinding]) -> strata_iac::Result<String> {
            self.record("plan", stage);
            Ok(format!("No changes for {}", stage.id))
        }

        async fn apply(&self, stage: &Stage, _vars: &[VarBinding]) -> strata_iac::Result<()> {
            self.record("apply", stage);
            if self.failing_applies.contains(&stage.id) {
                return Err(failure("Error: apply failed"));
            }
            Ok(())
        }

        async fn destroy(
            &self,
            stage: &Stage,
            vars: &[VarBinding],
            _targets: &[String],
        ) -> strata_iac::Result<()> {
            self.record("destroy", stage);
            self.destroy_vars
                .lock()
                .unwrap()
                .push((stage.id.clone(), vars.to_vec()));
            let mut failures = self.destroy_failures.lock().unwrap();
            match failures.get_mut(&stage.id) {
                Some(queue) if !queue.is_empty() => Err(failure(&queue.remove(0))),
                _ => Ok(()),
            }
        }

        async fn refresh(&self, stage: &Stage, _vars: &[VarBinding]) -> strata_iac::Result<()> {
            self.record("refresh", stage);
            Ok(())
        }

        async fn output(&self, stage: &Stage) -> strata_iac::Result<OutputBundle> {
            self.record("output", stage);
            Ok(OutputBundle::new())
        }

        async fn show(&self, stage: &Stage) -> strata_iac::Result<Option<StateTree>> {
            self.record("show", stage);
            Ok(None)
        }
    }

    #[derive(Default)]
    struct Escalations {
        journal: Mutex<Vec<String>>,
        blocked: bool,
    }

    impl Escalations {
        fn entries(&self) -> Vec<String> {
            self.journal.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ClusterRemediator for Escalations {
        async fn remediate(&self) -> RemediationReport {
            self.journal.lock().unwrap().push("remediate".to_string());
            RemediationReport::default()
        }
    }

    #[async_trait]
    impl CloudReclaimer for Escalations {
        async fn reclaim(&self) -> ReclaimReport {
            self.journal.lock().unwrap().push("reclaim".to_string());
            ReclaimReport::default()
        }

        async fn probe_blockers(&self) -> bool {
            self.journal.lock().unwrap().push("probe".to_string());
            self.blocked
        }
    }

    fn project() -> Project {
        Project::new(
            "platform",
            vec![
                Stage::new("apps", "stages/apps", 999),
                Stage::new("network", "stages/network", 1),
                Stage::new("cluster", "stages/cluster", 10),
            ],
        )
        .unwrap()
    }

    fn settings(max_retries: u32) -> Settings {
        let mut settings = Settings::default();
        settings.teardown = TeardownSettings {
            max_retries,
            retry_delay_secs: 0,
        };
        settings
    }

    fn orchestrator(root: &Path, project: Project, executor: Arc<FakeExecutor>) -> Orchestrator {
        Orchestrator::new(project, root, executor).with_settings(settings(3))
    }

    #[tokio::test]
    async fn test_install_runs_ascending() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let orchestrator = orchestrator(temp_dir.path(), project(), executor.clone());

        let report = orchestrator.install().await;

        assert!(report.is_success());
        assert_eq!(executor.calls_for("apply"), vec!["network", "cluster", "apps"]);
        assert_eq!(
            executor.calls()[..2],
            ["init:network".to_string(), "apply:network".to_string()]
        );
        assert!(workspace::shared_vars_path(temp_dir.path()).exists());
        assert_eq!(report.timing.phase("apply:apps").unwrap().outcome, PhaseOutcome::Ok);
    }

    #[tokio::test]
    async fn test_install_stops_at_first_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default().failing_apply("cluster"));
        let orchestrator = orchestrator(temp_dir.path(), project(), executor.clone());

        let report = orchestrator.install().await;

        assert_eq!(executor.calls_for("apply"), vec!["network", "cluster"]);
        assert!(matches!(
            report.result,
            Err(LifecycleError::StageFailed {
                operation: Operation::Apply,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_clean_runs_descending_and_finishes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        let executor = Arc::new(FakeExecutor::default());
        let escalations = Arc::new(Escalations::default());
        let orchestrator = orchestrator(root, project(), executor.clone())
            .with_remediator(escalations.clone())
            .with_reclaimer(escalations.clone());
        std::fs::create_dir_all(root.join("stages/network/.terraform")).unwrap();

        let report = orchestrator.clean().await;

        assert!(report.is_success());
        assert_eq!(executor.calls_for("init"), vec!["network", "cluster", "apps"]);
        assert_eq!(executor.calls_for("refresh"), vec!["network", "cluster", "apps"]);
        assert_eq!(executor.calls_for("destroy"), vec!["apps", "cluster", "network"]);
        // nothing blocked, so no proactive reclaim
        assert_eq!(escalations.entries(), vec!["remediate", "probe"]);
        assert_eq!(report.timing.phase("backend").unwrap().outcome, PhaseOutcome::Ok);
        assert!(!root.join("stages/network/.terraform").exists());
        assert!(!workspace::shared_vars_path(root).exists());
    }

    #[tokio::test]
    async fn test_fatal_destroy_aborts_remaining_stages() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor =
            Arc::new(FakeExecutor::default().failing_destroy("cluster", &["AccessDenied: not allowed"]));
        let orchestrator = orchestrator(temp_dir.path(), project(), executor.clone());

        let report = orchestrator.clean().await;

        assert_eq!(executor.calls_for("destroy"), vec!["apps", "cluster"]);
        match &report.result {
            Err(LifecycleError::TeardownFailed { stage, attempts, .. }) => {
                assert_eq!(stage, "cluster");
                assert_eq!(*attempts, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            report.timing.phase("backend").unwrap().outcome,
            PhaseOutcome::Skipped(_)
        ));
        assert!(matches!(
            report.timing.phase("cleanup").unwrap().outcome,
            PhaseOutcome::Skipped(_)
        ));
        assert!(workspace::shared_vars_path(temp_dir.path()).exists());
    }

    #[tokio::test]
    async fn test_blocked_destroy_escalates_then_succeeds() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(
            FakeExecutor::default()
                .failing_destroy("network", &["DependencyViolation: sg-123 has a dependent object"]),
        );
        let escalations = Arc::new(Escalations::default());
        let orchestrator = orchestrator(temp_dir.path(), project(), executor.clone())
            .with_reclaimer(escalations.clone());

        let report = orchestrator.clean().await;

        assert!(report.is_success());
        assert_eq!(
            executor.calls_for("destroy"),
            vec!["apps", "cluster", "network", "network"]
        );
        assert_eq!(escalations.entries(), vec!["probe", "reclaim"]);
        assert_eq!(
            report.timing.phase("escalate:reclaim:network").unwrap().outcome,
            PhaseOutcome::Ok
        );
    }

    #[tokio::test]
    async fn test_proactive_reclaim_when_blockers_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let escalations = Arc::new(Escalations {
            blocked: true,
            ..Default::default()
        });
        let orchestrator = orchestrator(temp_dir.path(), project(), executor.clone())
            .with_reclaimer(escalations.clone());

        let report = orchestrator.clean().await;

        assert!(report.is_success());
        assert_eq!(escalations.entries(), vec!["probe", "reclaim"]);
        assert_eq!(report.timing.phase("reclaim").unwrap().outcome, PhaseOutcome::Ok);
    }

    #[tokio::test]
    async fn test_skip_and_bypass() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project = Project::new(
            "platform",
            vec![
                Stage::new("network", "stages/network", 1).with_destroy(DestroyPolicy {
                    skip: true,
                    ..Default::default()
                }),
                // filtered destroy over an empty state: nothing to do
                Stage::new("cluster", "stages/cluster", 10).with_destroy(DestroyPolicy {
                    include: vec![AddressPattern::exact("module.eks")],
                    ..Default::default()
                }),
            ],
        )
        .unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let orchestrator = orchestrator(temp_dir.path(), project, executor.clone());

        let report = orchestrator.clean().await;

        assert!(report.is_success());
        assert!(executor.calls_for("destroy").is_empty());
        assert_eq!(executor.calls_for("show"), vec!["cluster"]);
        assert_eq!(executor.calls_for("refresh"), vec!["cluster"]);
        assert!(matches!(
            report.timing.phase("destroy:network").unwrap().outcome,
            PhaseOutcome::Skipped(_)
        ));
        assert!(matches!(
            report.timing.phase("destroy:cluster").unwrap().outcome,
            PhaseOutcome::Skipped(_)
        ));
    }

    #[tokio::test]
    async fn test_override_vars_controls_destroy_inputs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project = Project::new(
            "platform",
            vec![
                Stage::new("network", "stages/network", 1)
                    .with_variable("cidr", StageVariable::Literal("10.0.0.0/16".to_string())),
                Stage::new("cluster", "stages/cluster", 10)
                    .with_variable("version", StageVariable::Literal("1.30".to_string()))
                    .with_destroy(DestroyPolicy {
                        override_vars: true,
                        ..Default::default()
                    }),
            ],
        )
        .unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let orchestrator = orchestrator(temp_dir.path(), project, executor.clone())
            .with_settings(Settings {
                clean: strata_config::CleanSettings {
                    refresh: false,
                    proactive_reclaim: false,
                },
                ..settings(0)
            });

        let report = orchestrator.clean().await;

        assert!(report.is_success());
        let destroyed = executor.destroy_vars.lock().unwrap().clone();
        assert_eq!(
            destroyed,
            vec![
                ("cluster".to_string(), vec![VarBinding::new("version", "1.30")]),
                ("network".to_string(), vec![]),
            ]
        );
        assert!(executor.calls_for("refresh").is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_clean_destroys_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let orchestrator = orchestrator(temp_dir.path(), project(), executor.clone());
        orchestrator.cancel_token().cancel();

        let report = orchestrator.clean().await;

        assert!(matches!(report.result, Err(LifecycleError::Cancelled)));
        assert!(executor.calls_for("destroy").is_empty());
        for phase in ["backend", "cleanup"] {
            assert_eq!(
                report.timing.phase(phase).unwrap().outcome,
                PhaseOutcome::Skipped("cancelled".to_string())
            );
        }
    }

    #[tokio::test]
    async fn test_clean_inits_before_refresh_and_destroy() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let mut settings = settings(3);
        settings.clean.refresh = false;
        let orchestrator = Orchestrator::new(project(), temp_dir.path(), executor.clone())
            .with_settings(settings);

        let report = orchestrator.clean().await;

        assert!(report.is_success());
        assert_eq!(
            executor.calls(),
            vec![
                "init:network",
                "init:cluster",
                "init:apps",
                "destroy:apps",
                "destroy:cluster",
                "destroy:network",
            ]
        );
    }

    #[tokio::test]
    async fn test_clean_init_failure_destroys_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default().failing_init("cluster"));
        let orchestrator = orchestrator(temp_dir.path(), project(), executor.clone());

        let report = orchestrator.clean().await;

        assert!(matches!(
            report.result,
            Err(LifecycleError::StageFailed {
                operation: Operation::Init,
                ..
            })
        ));
        assert_eq!(executor.calls_for("init"), vec!["network", "cluster"]);
        assert!(executor.calls_for("refresh").is_empty());
        assert!(executor.calls_for("destroy").is_empty());
        assert_eq!(
            report.timing.phase("backend").unwrap().outcome,
            PhaseOutcome::Skipped("teardown aborted".to_string())
        );
    }

    #[tokio::test]
    async fn test_targets_and_plan() {
        let temp_dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let orchestrator = orchestrator(temp_dir.path(), project(), executor.clone());

        assert_eq!(orchestrator.targets("network").await.unwrap(), DestroyPlan::Full);
        let plan = orchestrator.plan("cluster").await.unwrap();
        assert!(plan.contains("cluster"));
        assert_eq!(executor.calls(), vec!["init:cluster", "plan:cluster"]);
        assert!(orchestrator.plan("missing").await.is_err());
    }
}
