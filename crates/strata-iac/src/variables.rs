//! Stage variable resolution
//!
//! Each variable has exactly one source. Missing env/config/secret values are
//! logged and left out, so the IaC unit's own default applies.

use crate::error::Result;
use crate::executor::{IacExecutor, OutputBundle, VarBinding};
use serde_json::Value;
use std::collections::HashMap;
use strata_core::{KeyLookup, OutputRef, Project, Stage, StageVariable};

/// Output bundles fetched during one resolution pass, keyed by stage id
#[derive(Debug, Default)]
pub struct StageOutputCache {
    bundles: HashMap<String, OutputBundle>,
}

impl StageOutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stage: &str) -> Option<&OutputBundle> {
        self.bundles.get(stage)
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.bundles.contains_key(stage)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

/// Turns a stage's declared inputs into `key=value` bindings
pub struct VariableResolver<'a> {
    project: &'a Project,
    executor: &'a dyn IacExecutor,
    config: &'a dyn KeyLookup,
    secrets: &'a dyn KeyLookup,
}

impl<'a> VariableResolver<'a> {
    pub fn new(
        project: &'a Project,
        executor: &'a dyn IacExecutor,
        config: &'a dyn KeyLookup,
        secrets: &'a dyn KeyLookup,
    ) -> Self {
        Self {
            project,
            executor,
            config,
            secrets,
        }
    }

    /// Resolve with a fresh cache scoped to this call
    pub async fn resolve(&self, stage: &Stage) -> Result<Vec<VarBinding>> {
        let mut cache = StageOutputCache::new();
        self.resolve_with_cache(stage, &mut cache).await
    }

    /// Resolve, sharing `cache` with the caller
    ///
    /// Only a failing output fetch is an error; every per-variable miss is
    /// logged and skipped.
    pub async fn resolve_with_cache(
        &self,
        stage: &Stage,
        cache: &mut StageOutputCache,
    ) -> Result<Vec<VarBinding>> {
        let mut bindings = Vec::with_capacity(stage.variables.len());

        for (name, variable) in &stage.variables {
            let value = match variable {
                StageVariable::Literal(value) => Some(value.clone()),
                StageVariable::Env(var) => std::env::var(var).ok(),
                StageVariable::Config(key) => lookup_or_warn(self.config, key, name, "config"),
                StageVariable::Secret(key) => lookup_or_warn(self.secrets, key, name, "secret"),
                StageVariable::StageOutput(reference) => {
                    self.resolve_output(reference, name, cache).await?
                }
                StageVariable::Unset => None,
            };

            match value.filter(|v| !v.is_empty()) {
                Some(value) => {
                    tracing::debug!(
                        stage = %stage.id,
                        variable = %name,
                        source = variable.source_name(),
                        "Resolved variable"
                    );
                    bindings.push(VarBinding::new(name.clone(), value));
                }
                None => {
                    tracing::warn!(
                        stage = %stage.id,
                        variable = %name,
                        source = variable.source_name(),
                        "No value, leaving variable unset"
                    );
                }
            }
        }

        Ok(bindings)
    }

    async fn resolve_output(
        &self,
        reference: &str,
        variable: &str,
        cache: &mut StageOutputCache,
    ) -> Result<Option<String>> {
        let Some(output_ref) = OutputRef::parse(reference) else {
            tracing::warn!(variable, reference, "Unparseable output reference, skipping");
            return Ok(None);
        };
        let Some(source) = self.project.stage(&output_ref.stage) else {
            tracing::warn!(variable, reference, "Output reference names an unknown stage, skipping");
            return Ok(None);
        };

        if !cache.contains(&source.id) {
            let bundle = self.executor.output(source).await?;
            cache.bundles.insert(source.id.clone(), bundle);
        }

        let value = cache
            .get(&source.id)
            .and_then(|bundle| bundle.get(&output_ref.output))
            .and_then(|value| query_path(value, output_ref.path.as_deref()));

        if value.is_none() {
            tracing::warn!(variable, reference, "Output not found");
        }
        Ok(value.and_then(render_scalar))
    }
}

fn lookup_or_warn(
    store: &dyn KeyLookup,
    key: &str,
    variable: &str,
    source: &str,
) -> Option<String> {
    match store.lookup(key) {
        Ok(value) => value,
        Err(e) => {
            // the error text never carries the secret value itself
            tracing::warn!(variable, key, source, error = %e, "Lookup failed");
            None
        }
    }
}

/// Walk a dotted path inside a JSON value; array segments are indices
fn query_path<'v>(value: &'v Value, path: Option<&str>) -> Option<&'v Value> {
    let Some(path) = path else {
        return Some(value);
    };
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Strings lose their quotes; composites stay JSON text; null is no value
fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IacError;
    use crate::state::StateTree;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use strata_config::ValueFile;

    /// Executor that only answers `output`, counting calls per stage
    struct OutputOnly {
        bundles: HashMap<String, OutputBundle>,
        calls: Mutex<Vec<String>>,
    }

    impl OutputOnly {
        fn new() -> Self {
            let mut bundles = HashMap::new();
            bundles.insert(
                "network".to_string(),
                OutputBundle::from([
                    ("vpc_id".to_string(), json!("vpc-123")),
                    ("azs".to_string(), json!(["us-east-1a", "us-east-1b"])),
                    ("nat".to_string(), json!({"ip": "10.0.0.1", "count": 2})),
                    ("gone".to_string(), Value::Null),
                ]),
            );
            Self {
                bundles,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IacExecutor for OutputOnly {
        async fn init(&self, _: &Stage) -> Result<()> {
            unreachable!()
        }
        async fn plan(&self, _: &Stage, _: &[VarBinding]) -> Result<String> {
            unreachable!()
        }
        async fn apply(&self, _: &Stage, _: &[VarBinding]) -> Result<()> {
            unreachable!()
        }
        async fn destroy(&self, _: &Stage, _: &[VarBinding], _: &[String]) -> Result<()> {
            unreachable!()
        }
        async fn refresh(&self, _: &Stage, _: &[VarBinding]) -> Result<()> {
            unreachable!()
        }
        async fn output(&self, stage: &Stage) -> Result<OutputBundle> {
            self.calls.lock().unwrap().push(stage.id.clone());
            self.bundles
                .get(&stage.id)
                .cloned()
                .ok_or_else(|| IacError::CommandFailed {
                    command: "terraform output".to_string(),
                    stderr: "No outputs found".to_string(),
                })
        }
        async fn show(&self, _: &Stage) -> Result<Option<StateTree>> {
            unreachable!()
        }
    }

    fn project(consumer: Stage) -> Project {
        Project::new(
            "test",
            vec![
                Stage::new("network", "stages/network", 1),
                Stage::new("empty", "stages/empty", 2),
                consumer,
            ],
        )
        .unwrap()
    }

    fn output(reference: &str) -> StageVariable {
        StageVariable::StageOutput(reference.to_string())
    }

    #[tokio::test]
    async fn test_sources_and_omissions() {
        let stage = Stage::new("apps", "stages/apps", 10)
            .with_variable("region", StageVariable::Literal("us-east-1".into()))
            .with_variable("blank", StageVariable::Literal(String::new()))
            .with_variable("token", StageVariable::Env("STRATA_TEST_TOKEN".into()))
            .with_variable("missing_env", StageVariable::Env("STRATA_TEST_UNSET".into()))
            .with_variable("domain", StageVariable::Config("dns.domain".into()))
            .with_variable("missing_cfg", StageVariable::Config("dns.nope".into()))
            .with_variable("db_password", StageVariable::Secret("db.password".into()))
            .with_variable("nothing", StageVariable::Unset);
        let project = project(stage.clone());
        let executor = OutputOnly::new();
        let config = ValueFile::from_yaml("dns:\n  domain: example.com\n").unwrap();
        let secrets = HashMap::from([("db.password".to_string(), "hunter2".to_string())]);

        let resolver = VariableResolver::new(&project, &executor, &config, &secrets);
        let bindings = temp_env::async_with_vars(
            [
                ("STRATA_TEST_TOKEN", Some("abc")),
                ("STRATA_TEST_UNSET", None::<&str>),
            ],
            resolver.resolve(&stage),
        )
        .await
        .unwrap();

        let rendered: Vec<String> = bindings.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "db_password=hunter2",
                "domain=example.com",
                "region=us-east-1",
                "token=abc",
            ]
        );
        assert!(rendered.iter().all(|b| !b.ends_with('=')));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_output_served_from_cache_matches_fresh_fetch() {
        let stage = Stage::new("apps", "stages/apps", 10)
            .with_variable("vpc_id", output("network.outputs.vpc_id"))
            .with_variable("vpc_again", output("network.outputs.vpc_id"));
        let project = project(stage.clone());
        let executor = OutputOnly::new();
        let empty = HashMap::new();
        let resolver = VariableResolver::new(&project, &executor, &empty, &empty);

        let bindings = resolver.resolve(&stage).await.unwrap();

        assert_eq!(executor.calls(), vec!["network"]);
        assert_eq!(bindings[0], VarBinding::new("vpc_again", "vpc-123"));
        assert_eq!(bindings[1], VarBinding::new("vpc_id", "vpc-123"));
    }

    #[tokio::test]
    async fn test_shared_cache_spans_calls() {
        let stage = Stage::new("apps", "stages/apps", 10)
            .with_variable("vpc_id", output("network.outputs.vpc_id"));
        let project = project(stage.clone());
        let executor = OutputOnly::new();
        let empty = HashMap::new();
        let resolver = VariableResolver::new(&project, &executor, &empty, &empty);

        let mut cache = StageOutputCache::new();
        resolver.resolve_with_cache(&stage, &mut cache).await.unwrap();
        resolver.resolve_with_cache(&stage, &mut cache).await.unwrap();
        assert_eq!(executor.calls().len(), 1);
        assert!(cache.contains("network"));

        resolver.resolve(&stage).await.unwrap();
        assert_eq!(executor.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_compound_output_keys() {
        let stage = Stage::new("apps", "stages/apps", 10)
            .with_variable("az", output("network.outputs.azs.1"))
            .with_variable("nat_ip", output("network.outputs.nat.ip"))
            .with_variable("nat_count", output("network.outputs.nat.count"))
            .with_variable("nat", output("network.outputs.nat"))
            .with_variable("gone", output("network.outputs.gone"))
            .with_variable("absent", output("network.outputs.nat.missing"));
        let project = project(stage.clone());
        let executor = OutputOnly::new();
        let empty = HashMap::new();
        let resolver = VariableResolver::new(&project, &executor, &empty, &empty);

        let bindings = resolver.resolve(&stage).await.unwrap();
        let rendered: Vec<String> = bindings.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "az=us-east-1b",
                r#"nat={"count":2,"ip":"10.0.0.1"}"#,
                "nat_count=2",
                "nat_ip=10.0.0.1",
            ]
        );
    }

    #[tokio::test]
    async fn test_bad_references_are_skipped() {
        let stage = Stage::new("apps", "stages/apps", 10)
            .with_variable("malformed", output("network.vpc_id"))
            .with_variable("unknown", output("storage.outputs.bucket"))
            .with_variable("region", StageVariable::Literal("eu-west-1".into()));
        let project = project(stage.clone());
        let executor = OutputOnly::new();
        let empty = HashMap::new();
        let resolver = VariableResolver::new(&project, &executor, &empty, &empty);

        let bindings = resolver.resolve(&stage).await.unwrap();
        assert_eq!(bindings, vec![VarBinding::new("region", "eu-west-1")]);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_output_fetch_propagates() {
        let stage = Stage::new("apps", "stages/apps", 10)
            .with_variable("x", output("empty.outputs.x"));
        let project = project(stage.clone());
        let executor = OutputOnly::new();
        let empty = HashMap::new();
        let resolver = VariableResolver::new(&project, &executor, &empty, &empty);

        let err = resolver.resolve(&stage).await.unwrap_err();
        assert!(matches!(err, IacError::CommandFailed { .. }));
    }
}
