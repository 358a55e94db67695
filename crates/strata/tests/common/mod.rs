use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const PLATFORM: &str = r#"
project "platform"
cluster "prod-eks" region="us-east-1"

stage "network" order=1 path="stages/network"

stage "cluster" order=10 path="stages/cluster" {
    variables {
        vpc_id output="network.outputs.vpc_id"
    }
    destroy {
        include regex="^module\\.eks\\."
        exclude "module.eks.aws_kms_key.this"
    }
}

stage "apps" order=999 path="stages/apps" {
    requires-cluster
    destroy {
        skip #true
    }
}
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn with_platform() -> Self {
        let project = Self::new();
        project.write_project_kdl(PLATFORM);
        for stage in ["network", "cluster", "apps"] {
            fs::create_dir_all(project.root.path().join("stages").join(stage)).unwrap();
        }
        project
    }

    pub fn write_project_kdl(&self, content: &str) {
        fs::write(self.root.path().join("strata.kdl"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
