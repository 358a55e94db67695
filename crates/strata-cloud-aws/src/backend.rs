//! S3 + DynamoDB state backend teardown

use crate::cli::{AwsCli, ignore_not_found, is_not_found};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strata_cloud::CloudError;
use strata_core::BackendConfig;
use strata_iac::{IacError, StateBackend};

/// delete-objects accepts at most 1000 keys per call
const DELETE_BATCH: usize = 1000;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectVersions {
    #[serde(default)]
    versions: Vec<ObjectId>,
    #[serde(default)]
    delete_markers: Vec<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectId {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteRequest<'a> {
    objects: &'a [ObjectId],
    quiet: bool,
}

/// Remote state in an S3 bucket with an optional DynamoDB lock table
pub struct AwsStateBackend {
    cli: AwsCli,
    config: BackendConfig,
}

impl AwsStateBackend {
    pub fn new(cli: AwsCli, config: BackendConfig) -> Self {
        Self { cli, config }
    }

    /// Delete every object version and delete marker, then the bucket
    async fn remove_bucket(&self) -> strata_cloud::Result<()> {
        let bucket = self.config.bucket.as_str();
        let region = self.config.region.as_str();

        let listed: strata_cloud::Result<ObjectVersions> = self
            .cli
            .query(region, &["s3api", "list-object-versions", "--bucket", bucket])
            .await;
        let versions = match listed {
            Ok(versions) => versions,
            Err(e) if is_not_found(&e) => {
                tracing::debug!(bucket, "State bucket already gone");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let objects: Vec<ObjectId> = versions
            .versions
            .into_iter()
            .chain(versions.delete_markers)
            .collect();
        for batch in objects.chunks(DELETE_BATCH) {
            let request = serde_json::to_string(&DeleteRequest {
                objects: batch,
                quiet: true,
            })?;
            self.cli
                .run_command(
                    region,
                    &["s3api", "delete-objects", "--bucket", bucket, "--delete", &request],
                )
                .await?;
        }
        tracing::debug!(bucket, objects = objects.len(), "Emptied state bucket");

        self.cli
            .run_idempotent(region, &["s3api", "delete-bucket", "--bucket", bucket])
            .await
    }

    async fn remove_lock_table(&self, table: &str) -> strata_cloud::Result<()> {
        ignore_not_found(
            self.cli
                .run_command(
                    &self.config.region,
                    &["dynamodb", "delete-table", "--table-name", table],
                )
                .await
                .map(|_| ()),
        )
    }
}

fn backend_error(what: &str, e: CloudError) -> IacError {
    IacError::Backend(format!("{}: {}", what, e))
}

#[async_trait]
impl StateBackend for AwsStateBackend {
    fn describe(&self) -> String {
        match &self.config.lock_table {
            Some(table) => format!("s3://{} + dynamodb:{}", self.config.bucket, table),
            None => format!("s3://{}", self.config.bucket),
        }
    }

    async fn teardown(&self) -> strata_iac::Result<()> {
        tracing::info!(backend = %self.describe(), "Removing state backend");

        self.remove_bucket()
            .await
            .map_err(|e| backend_error(&format!("bucket {}", self.config.bucket), e))?;

        if let Some(table) = &self.config.lock_table {
            self.remove_lock_table(table)
                .await
                .map_err(|e| backend_error(&format!("lock table {}", table), e))?;
        }
        Ok(())
    }
}
