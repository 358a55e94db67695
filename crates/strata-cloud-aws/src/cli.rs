//! aws CLI wrapper

use std::process::Stdio;
use strata_cloud::{CloudError, Result};
use tokio::process::Command;

/// Error codes that mean the resource is already gone
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidInstanceID.NotFound",
    "InvalidNetworkInterfaceID.NotFound",
    "InvalidAttachmentID.NotFound",
    "InvalidGroup.NotFound",
    "InvalidPermission.NotFound",
    "LoadBalancerNotFound",
    "NoSuchBucket",
    "ResourceNotFoundException",
];

/// aws CLI wrapper
#[derive(Debug, Clone)]
pub struct AwsCli {
    binary: String,
    profile: Option<String>,
}

impl Default for AwsCli {
    fn default() -> Self {
        Self::new()
    }
}

impl AwsCli {
    pub fn new() -> Self {
        Self {
            binary: "aws".to_string(),
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Check that the aws CLI is on PATH
    pub async fn check_installed(&self) -> Result<()> {
        let which = Command::new("which").arg(&self.binary).output().await?;
        if !which.status.success() {
            return Err(CloudError::BinaryNotFound(self.binary.clone()));
        }
        Ok(())
    }

    /// Run an aws command in `region` and return stdout (JSON)
    pub(crate) async fn run_command(&self, region: &str, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd.arg("--region").arg(region);
        cmd.arg("--output").arg("json");
        if let Some(profile) = &self.profile {
            cmd.arg("--profile").arg(profile);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: aws {} --region {}", args.join(" "), region);

        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CloudError::BinaryNotFound(self.binary.clone()),
            _ => CloudError::Io(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CloudError::CommandFailed {
                command: command_name(args),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a destructive command; "not found" counts as done
    pub(crate) async fn run_idempotent(&self, region: &str, args: &[&str]) -> Result<()> {
        ignore_not_found(self.run_command(region, args).await.map(|_| ()))
    }

    /// Run a describe-style command and parse its JSON output
    pub(crate) async fn query<T>(&self, region: &str, args: &[&str]) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let stdout = self.run_command(region, args).await?;
        parse_json(&command_name(args), &stdout)
    }
}

fn command_name(args: &[&str]) -> String {
    let name: Vec<&str> = args.iter().take(2).copied().collect();
    format!("aws {}", name.join(" "))
}

pub(crate) fn parse_json<T>(command: &str, stdout: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if stdout.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(stdout).map_err(|e| CloudError::InvalidResponse {
        command: command.to_string(),
        message: e.to_string(),
    })
}

pub(crate) fn is_not_found(error: &CloudError) -> bool {
    match error {
        CloudError::CommandFailed { stderr, .. } => {
            NOT_FOUND_CODES.iter().any(|code| stderr.contains(code))
        }
        _ => false,
    }
}

pub(crate) fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if is_not_found(&e) => {
            tracing::debug!(error = %e, "Already gone");
            Ok(())
        }
        other => other,
    }
}
