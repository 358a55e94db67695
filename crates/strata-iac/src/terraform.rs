//! terraform CLI wrapper
//!
//! Every call runs `terraform -chdir=<stage dir>` with `-input=false -no-color`.

use crate::error::{IacError, Result};
use crate::executor::{IacExecutor, OutputBundle, VarBinding};
use crate::state::StateTree;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use strata_core::Stage;
use tokio::process::Command;

/// terraform CLI wrapper
pub struct Terraform {
    binary: String,
    project_root: PathBuf,
    /// Shared `-var-file`, passed when it exists
    shared_var_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct OutputEntry {
    value: serde_json::Value,
}

impl Terraform {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            binary: "terraform".to_string(),
            project_root: project_root.into(),
            shared_var_file: None,
        }
    }

    /// Use a different binary (e.g. `tofu`)
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_shared_var_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.shared_var_file = Some(path.into());
        self
    }

    /// Check that the binary is on PATH
    pub async fn check_installed(&self) -> Result<()> {
        let which = Command::new("which").arg(&self.binary).output().await?;
        if !which.status.success() {
            return Err(IacError::BinaryNotFound(self.binary.clone()));
        }
        Ok(())
    }

    fn stage_dir(&self, stage: &Stage) -> PathBuf {
        self.project_root.join(&stage.path)
    }

    fn var_args(&self, vars: &[VarBinding]) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(path) = self.shared_var_file.as_deref().filter(|p| p.exists()) {
            args.push(format!("-var-file={}", absolute(path).display()));
        }
        for var in vars {
            args.push("-var".to_string());
            args.push(var.to_string());
        }
        args
    }

    /// Run a terraform command in the stage directory and return stdout
    async fn run_command(&self, stage: &Stage, args: &[String]) -> Result<String> {
        let dir = self.stage_dir(stage);
        let mut cmd = Command::new(&self.binary);
        cmd.arg(format!("-chdir={}", dir.display()));
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        // -var values may carry secrets; log the subcommand only
        let subcommand = args.first().map(String::as_str).unwrap_or_default();
        tracing::debug!(stage = %stage.id, "Running: {} {}", self.binary, subcommand);

        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IacError::BinaryNotFound(self.binary.clone()),
            _ => IacError::Io(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IacError::CommandFailed {
                command: format!("{} {} ({})", self.binary, subcommand, stage.id),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn base_args(subcommand: &str) -> Vec<String> {
    vec![
        subcommand.to_string(),
        "-input=false".to_string(),
        "-no-color".to_string(),
    ]
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[async_trait]
impl IacExecutor for Terraform {
    async fn init(&self, stage: &Stage) -> Result<()> {
        self.run_command(stage, &base_args("init")).await?;
        Ok(())
    }

    async fn plan(&self, stage: &Stage, vars: &[VarBinding]) -> Result<String> {
        let mut args = base_args("plan");
        args.extend(self.var_args(vars));
        self.run_command(stage, &args).await
    }

    async fn apply(&self, stage: &Stage, vars: &[VarBinding]) -> Result<()> {
        let mut args = base_args("apply");
        args.push("-auto-approve".to_string());
        args.extend(self.var_args(vars));
        self.run_command(stage, &args).await?;
        Ok(())
    }

    async fn destroy(&self, stage: &Stage, vars: &[VarBinding], targets: &[String]) -> Result<()> {
        let mut args = base_args("destroy");
        args.push("-auto-approve".to_string());
        args.extend(self.var_args(vars));
        args.extend(targets.iter().map(|t| format!("-target={}", t)));
        self.run_command(stage, &args).await?;
        Ok(())
    }

    async fn refresh(&self, stage: &Stage, vars: &[VarBinding]) -> Result<()> {
        let mut args = base_args("apply");
        args.push("-refresh-only".to_string());
        args.push("-auto-approve".to_string());
        args.extend(self.var_args(vars));
        self.run_command(stage, &args).await?;
        Ok(())
    }

    async fn output(&self, stage: &Stage) -> Result<OutputBundle> {
        let args = vec!["output".to_string(), "-json".to_string()];
        let stdout = self.run_command(stage, &args).await?;
        parse_outputs(&stdout)
    }

    async fn show(&self, stage: &Stage) -> Result<Option<StateTree>> {
        let args = vec![
            "show".to_string(),
            "-json".to_string(),
            "-no-color".to_string(),
        ];
        let stdout = self.run_command(stage, &args).await?;
        parse_show(&stage.id, &stdout)
    }
}

/// Parse `terraform output -json`
pub(crate) fn parse_outputs(stdout: &str) -> Result<OutputBundle> {
    if stdout.trim().is_empty() {
        return Ok(OutputBundle::new());
    }
    let entries: BTreeMap<String, OutputEntry> = serde_json::from_str(stdout)?;
    Ok(entries.into_iter().map(|(k, v)| (k, v.value)).collect())
}

/// Parse `terraform show -json`; no `values` means no state yet
pub(crate) fn parse_show(stage: &str, stdout: &str) -> Result<Option<StateTree>> {
    if stdout.trim().is_empty() {
        return Ok(None);
    }
    let tree = StateTree::from_json(stdout).map_err(|e| IacError::InvalidState {
        stage: stage.to_string(),
        message: e.to_string(),
    })?;
    if tree.values.is_none() {
        return Ok(None);
    }
    Ok(Some(tree))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outputs() {
        let stdout = r#"{
            "vpc_id": {"sensitive": false, "type": "string", "value": "vpc-123"},
            "subnets": {"sensitive": false, "type": ["list", "string"], "value": ["a", "b"]}
        }"#;
        let outputs = parse_outputs(stdout).unwrap();
        assert_eq!(outputs["vpc_id"], serde_json::json!("vpc-123"));
        assert_eq!(outputs["subnets"], serde_json::json!(["a", "b"]));
        assert!(parse_outputs("  ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_show_without_state() {
        assert!(parse_show("a", r#"{"format_version": "1.0"}"#).unwrap().is_none());
        assert!(parse_show("a", "").unwrap().is_none());
        assert!(matches!(
            parse_show("a", "not json"),
            Err(IacError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_var_args_include_shared_file_when_present() {
        let temp_dir = tempfile::tempdir().unwrap();
        let shared = temp_dir.path().join("shared.auto.tfvars.json");

        let tf = Terraform::new(temp_dir.path()).with_shared_var_file(&shared);
        let vars = vec![VarBinding::new("region", "us-east-1")];
        assert_eq!(tf.var_args(&vars), vec!["-var", "region=us-east-1"]);

        std::fs::write(&shared, "{}").unwrap();
        let args = tf.var_args(&vars);
        assert_eq!(args.len(), 3);
        assert!(args[0].starts_with("-var-file="));
    }
}
