//! kubectl CLI wrapper

use crate::api::ClusterApi;
use crate::error::{ClusterError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// kubectl CLI wrapper
#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: String,
    kubeconfig: Option<PathBuf>,
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new()
    }
}

impl Kubectl {
    pub fn new() -> Self {
        Self {
            binary: "kubectl".to_string(),
            kubeconfig: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// The kubeconfig kubectl will read
    ///
    /// Explicit path, then the first entry of `KUBECONFIG`, then `~/.kube/config`.
    pub fn kubeconfig_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.kubeconfig {
            return Some(path.clone());
        }
        if let Ok(value) = std::env::var("KUBECONFIG")
            && let Some(first) = std::env::split_paths(&value).next()
            && !first.as_os_str().is_empty()
        {
            return Some(first);
        }
        dirs::home_dir().map(|home| home.join(".kube").join("config"))
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(path) = &self.kubeconfig {
            cmd.arg("--kubeconfig").arg(path);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // a timed-out call must not leave kubectl running
        cmd.kill_on_drop(true);
        cmd
    }

    /// Run a kubectl command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        self.run_with_input(args, None).await
    }

    async fn run_with_input(&self, args: &[&str], input: Option<&[u8]>) -> Result<String> {
        let mut cmd = self.command();
        cmd.args(args);
        if input.is_some() {
            cmd.stdin(Stdio::piped());
        }

        tracing::debug!("Running: kubectl {}", args.join(" "));

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ClusterError::BinaryNotFound(self.binary.clone()),
            _ => ClusterError::Io(e),
        })?;
        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin.write_all(input).await?;
        }
        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClusterError::CommandFailed {
                command: command_name(args),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Namespace document with both finalizer lists emptied
pub(crate) fn without_finalizers(mut namespace: serde_json::Value) -> serde_json::Value {
    if let Some(spec) = namespace.get_mut("spec").and_then(|s| s.as_object_mut()) {
        spec.insert("finalizers".to_string(), serde_json::json!([]));
    }
    if let Some(metadata) = namespace.get_mut("metadata").and_then(|m| m.as_object_mut()) {
        metadata.insert("finalizers".to_string(), serde_json::json!([]));
    }
    namespace
}

fn is_not_found(error: &ClusterError) -> bool {
    matches!(error, ClusterError::CommandFailed { stderr, .. }
        if stderr.contains("NotFound") || stderr.contains("not found"))
}

fn command_name(args: &[&str]) -> String {
    let name: Vec<&str> = args.iter().take(2).copied().collect();
    format!("kubectl {}", name.join(" "))
}

#[async_trait]
impl ClusterApi for Kubectl {
    fn credentials_present(&self) -> bool {
        self.kubeconfig_path().is_some_and(|p| p.is_file())
    }

    async fn cli_available(&self) -> bool {
        Command::new("which")
            .arg(&self.binary)
            .output()
            .await
            .is_ok_and(|out| out.status.success())
    }

    async fn probe(&self, timeout: Duration) -> Result<()> {
        let request_timeout = format!("--request-timeout={}s", timeout.as_secs().max(1));
        let args = ["cluster-info", request_timeout.as_str()];
        let probe = self.run_command(&args);
        match tokio::time::timeout(timeout, probe).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(ClusterError::Timeout(timeout)),
        }
    }

    async fn delete_all(&self, kind: &str) -> Result<()> {
        self.run_command(&["delete", kind, "--all", "--ignore-not-found", "--wait=false"])
            .await?;
        Ok(())
    }

    async fn delete(&self, kind: &str, name: &str) -> Result<()> {
        self.run_command(&["delete", kind, name, "--ignore-not-found", "--wait=false"])
            .await?;
        Ok(())
    }

    async fn namespace_phase(&self, namespace: &str) -> Result<Option<String>> {
        match self
            .run_command(&["get", "namespace", namespace, "-o", "jsonpath={.status.phase}"])
            .await
        {
            Ok(phase) => Ok(Some(phase.trim().to_string())),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn clear_namespace_finalizers(&self, namespace: &str) -> Result<()> {
        let current = self
            .run_command(&["get", "namespace", namespace, "-o", "json"])
            .await?;
        let document = without_finalizers(serde_json::from_str(&current)?);
        let body = serde_json::to_vec(&document)?;

        // spec.finalizers can only change through the finalize subresource
        let finalize = format!("/api/v1/namespaces/{}/finalize", namespace);
        self.run_with_input(&["replace", "--raw", &finalize, "-f", "-"], Some(&body))
            .await?;
        Ok(())
    }
}
