//! Local files the orchestrator creates and removes
//!
//! ```text
//! <root>/.strata/shared.auto.tfvars.json   cluster/region/project for every stage
//! <root>/.strata/tmp/                      scratch space
//! <root>/<stage>/.terraform/               executor working data
//! <root>/<stage>/.terraform.lock.hcl
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use strata_config::STATE_DIR;
use strata_core::Project;

pub const SHARED_VARS_FILE: &str = "shared.auto.tfvars.json";
pub const TMP_DIR: &str = "tmp";

pub fn shared_vars_path(root: &Path) -> PathBuf {
    root.join(STATE_DIR).join(SHARED_VARS_FILE)
}

/// Variables every stage receives through the shared var file
pub fn shared_vars(project: &Project) -> serde_json::Value {
    let mut vars = serde_json::Map::new();
    vars.insert("project".to_string(), project.name.clone().into());
    if let Some(cluster) = &project.cluster {
        vars.insert("cluster_name".to_string(), cluster.name.clone().into());
        vars.insert("region".to_string(), cluster.region.clone().into());
    }
    serde_json::Value::Object(vars)
}

pub async fn write_shared_vars(root: &Path, project: &Project) -> std::io::Result<PathBuf> {
    let path = shared_vars_path(root);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(&shared_vars(project))?;
    tokio::fs::write(&path, content).await?;
    tracing::debug!(path = %path.display(), "Wrote shared variables");
    Ok(path)
}

/// Remove scratch files left by a run; missing files are fine
pub async fn cleanup_local(root: &Path, project: &Project) -> std::io::Result<Vec<PathBuf>> {
    let state_dir = root.join(STATE_DIR);
    let mut targets = vec![shared_vars_path(root), state_dir.join(TMP_DIR)];
    for stage in project.forward() {
        let dir = root.join(&stage.path);
        targets.push(dir.join(".terraform"));
        targets.push(dir.join(".terraform.lock.hcl"));
    }

    let mut removed = Vec::new();
    for path in targets {
        let result = match tokio::fs::symlink_metadata(&path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(&path).await,
            Ok(_) => tokio::fs::remove_file(&path).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed");
                removed.push(path);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use strata_core::{ClusterTarget, Stage};

    fn project() -> Project {
        Project::new(
            "platform",
            vec![
                Stage::new("network", "stages/network", 1),
                Stage::new("cluster", "stages/cluster", 10),
            ],
        )
        .unwrap()
        .with_cluster(ClusterTarget {
            name: "prod-eks".to_string(),
            region: "us-east-1".to_string(),
            kubeconfig: None,
        })
    }

    #[tokio::test]
    async fn test_write_shared_vars() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_shared_vars(temp_dir.path(), &project()).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["cluster_name"], "prod-eks");
        assert_eq!(written["region"], "us-east-1");
        assert_eq!(written["project"], "platform");
    }

    #[tokio::test]
    async fn test_cleanup_local() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        let project = project();
        write_shared_vars(root, &project).await.unwrap();
        fs::create_dir_all(root.join(".strata/tmp/plans")).unwrap();
        fs::create_dir_all(root.join("stages/network/.terraform/providers")).unwrap();
        fs::write(root.join("stages/network/.terraform.lock.hcl"), "# lock").unwrap();
        fs::write(root.join("stages/network/main.tf"), "# keep").unwrap();

        let removed = cleanup_local(root, &project).await.unwrap();

        assert_eq!(removed.len(), 4);
        assert!(!shared_vars_path(root).exists());
        assert!(!root.join(".strata/tmp").exists());
        assert!(!root.join("stages/network/.terraform").exists());
        assert!(root.join("stages/network/main.tf").exists());

        // second pass finds nothing
        assert!(cleanup_local(root, &project).await.unwrap().is_empty());
    }
}
