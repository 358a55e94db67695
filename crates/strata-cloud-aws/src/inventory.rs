//! `CloudInventory` over elbv2 and ec2

use crate::cli::{AwsCli, is_not_found};
use crate::tags::{self, Tag};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use strata_cloud::{
    CloudInventory, GroupCriterion, InterfaceStatus, NetworkInterface, ReclaimScope, Result,
    TaggedResource,
};

/// describe-tags accepts at most 20 ARNs per call
const DESCRIBE_TAGS_BATCH: usize = 20;

const LIVE_INSTANCE_STATES: &str = "Name=instance-state-name,Values=pending,running,stopping,stopped";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancers {
    #[serde(default)]
    load_balancers: Vec<LoadBalancer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancer {
    load_balancer_arn: String,
    #[serde(default)]
    state: Option<LoadBalancerState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancerState {
    code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TagDescriptions {
    #[serde(default)]
    tag_descriptions: Vec<TagDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TagDescription {
    resource_arn: String,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservations {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Instance {
    instance_id: String,
    state: InstanceState,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceState {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkInterfaces {
    #[serde(default)]
    network_interfaces: Vec<Eni>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Eni {
    network_interface_id: String,
    status: String,
    #[serde(default)]
    requester_managed: bool,
    #[serde(default)]
    attachment: Option<EniAttachment>,
    #[serde(default)]
    tag_set: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EniAttachment {
    attachment_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroups {
    #[serde(default)]
    security_groups: Vec<SecurityGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroup {
    group_id: String,
    #[serde(default)]
    group_name: String,
    #[serde(default)]
    ip_permissions: Vec<serde_json::Value>,
    #[serde(default)]
    ip_permissions_egress: Vec<serde_json::Value>,
    #[serde(default)]
    tags: Vec<Tag>,
}

fn owner_or_default(tags: &[Tag], cluster_id: &str, fallback: &str) -> String {
    tags::owner_of(tags, cluster_id).unwrap_or_else(|| fallback.to_string())
}

impl Instance {
    fn into_resource(self, cluster_id: &str) -> TaggedResource {
        let owner = owner_or_default(&self.tags, cluster_id, "owned");
        TaggedResource::new(self.instance_id, owner, self.state.name)
    }
}

impl Eni {
    fn into_interface(self, cluster_id: &str) -> NetworkInterface {
        let owner = owner_or_default(&self.tag_set, cluster_id, "owned");
        NetworkInterface {
            resource: TaggedResource::new(self.network_interface_id, owner, self.status),
            attachment_id: self.attachment.and_then(|a| a.attachment_id),
            requester_managed: self.requester_managed,
        }
    }
}

impl AwsCli {
    async fn describe_security_group(&self, region: &str, id: &str) -> Result<Option<SecurityGroup>> {
        let result: Result<SecurityGroups> = self
            .query(region, &["ec2", "describe-security-groups", "--group-ids", id])
            .await;
        match result {
            Ok(groups) => Ok(groups.security_groups.into_iter().next()),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn interfaces_with_filter(
        &self,
        region: &str,
        tag_filter: &str,
        status: InterfaceStatus,
    ) -> Result<Vec<Eni>> {
        let status_filter = format!("Name=status,Values={}", status.as_str());
        let enis: NetworkInterfaces = self
            .query(
                region,
                &[
                    "ec2",
                    "describe-network-interfaces",
                    "--filters",
                    tag_filter,
                    &status_filter,
                ],
            )
            .await?;
        Ok(enis.network_interfaces)
    }
}

#[async_trait]
impl CloudInventory for AwsCli {
    async fn list_load_balancers(&self, scope: &ReclaimScope) -> Result<Vec<TaggedResource>> {
        let lbs: LoadBalancers = self
            .query(&scope.region, &["elbv2", "describe-load-balancers"])
            .await?;
        if lbs.load_balancers.is_empty() {
            return Ok(Vec::new());
        }

        let states: BTreeMap<String, String> = lbs
            .load_balancers
            .into_iter()
            .map(|lb| {
                let state = lb.state.map(|s| s.code).unwrap_or_default();
                (lb.load_balancer_arn, state)
            })
            .collect();
        let arns: Vec<&str> = states.keys().map(String::as_str).collect();

        let mut found = Vec::new();
        for batch in arns.chunks(DESCRIBE_TAGS_BATCH) {
            let mut args = vec!["elbv2", "describe-tags", "--resource-arns"];
            args.extend_from_slice(batch);
            let tagged: TagDescriptions = self.query(&scope.region, &args).await?;
            for description in tagged.tag_descriptions {
                if let Some(owner) = tags::owner_of(&description.tags, &scope.cluster_id) {
                    let status = states
                        .get(&description.resource_arn)
                        .cloned()
                        .unwrap_or_default();
                    found.push(TaggedResource::new(description.resource_arn, owner, status));
                }
            }
        }
        Ok(found)
    }

    async fn delete_load_balancer(&self, scope: &ReclaimScope, id: &str) -> Result<()> {
        tracing::info!(arn = %id, "Deleting load balancer");
        self.run_idempotent(
            &scope.region,
            &["elbv2", "delete-load-balancer", "--load-balancer-arn", id],
        )
        .await
    }

    async fn list_instances(&self, scope: &ReclaimScope) -> Result<Vec<TaggedResource>> {
        let owned = tags::cluster_owned_filter(&scope.cluster_id);
        let reservations: Reservations = self
            .query(
                &scope.region,
                &[
                    "ec2",
                    "describe-instances",
                    "--filters",
                    &owned,
                    LIVE_INSTANCE_STATES,
                ],
            )
            .await?;
        Ok(reservations
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .map(|i| i.into_resource(&scope.cluster_id))
            .collect())
    }

    async fn terminate_instances(&self, scope: &ReclaimScope, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut args = vec!["ec2", "terminate-instances", "--instance-ids"];
        args.extend(ids.iter().map(String::as_str));
        self.run_idempotent(&scope.region, &args).await
    }

    async fn list_network_interfaces(
        &self,
        scope: &ReclaimScope,
        status: InterfaceStatus,
    ) -> Result<Vec<NetworkInterface>> {
        let owned = tags::cluster_owned_filter(&scope.cluster_id);
        let cni = format!(
            "Name=tag:{},Values={}",
            tags::CNI_CLUSTER_TAG,
            scope.cluster_id
        );

        // the two tag filters would AND together in one call
        let mut by_id = BTreeMap::new();
        for filter in [&owned, &cni] {
            for eni in self
                .interfaces_with_filter(&scope.region, filter, status)
                .await?
            {
                by_id
                    .entry(eni.network_interface_id.clone())
                    .or_insert_with(|| eni.into_interface(&scope.cluster_id));
            }
        }
        Ok(by_id.into_values().collect())
    }

    async fn detach_network_interface(
        &self,
        scope: &ReclaimScope,
        attachment_id: &str,
    ) -> Result<()> {
        tracing::info!(attachment = %attachment_id, "Force-detaching network interface");
        self.run_idempotent(
            &scope.region,
            &[
                "ec2",
                "detach-network-interface",
                "--attachment-id",
                attachment_id,
                "--force",
            ],
        )
        .await
    }

    async fn delete_network_interface(&self, scope: &ReclaimScope, id: &str) -> Result<()> {
        tracing::info!(eni = %id, "Deleting network interface");
        self.run_idempotent(
            &scope.region,
            &["ec2", "delete-network-interface", "--network-interface-id", id],
        )
        .await
    }

    async fn list_security_groups(
        &self,
        scope: &ReclaimScope,
        criterion: GroupCriterion,
    ) -> Result<Vec<TaggedResource>> {
        let filter = tags::group_filter(criterion, &scope.cluster_id);
        let groups: SecurityGroups = self
            .query(
                &scope.region,
                &["ec2", "describe-security-groups", "--filters", &filter],
            )
            .await?;
        Ok(groups
            .security_groups
            .into_iter()
            // the VPC default group cannot be deleted
            .filter(|g| g.group_name != "default")
            .map(|g| {
                let owner = owner_or_default(&g.tags, &scope.cluster_id, &criterion.to_string());
                TaggedResource::new(g.group_id, owner, "")
            })
            .collect())
    }

    async fn revoke_security_group_rules(&self, scope: &ReclaimScope, id: &str) -> Result<()> {
        let Some(group) = self.describe_security_group(&scope.region, id).await? else {
            return Ok(());
        };

        let rule_sets = [
            ("revoke-security-group-ingress", &group.ip_permissions),
            ("revoke-security-group-egress", &group.ip_permissions_egress),
        ];
        for (command, rules) in rule_sets {
            if rules.is_empty() {
                continue;
            }
            let permissions = serde_json::to_string(rules)?;
            tracing::debug!(sg = %id, rules = rules.len(), "{}", command);
            self.run_idempotent(
                &scope.region,
                &["ec2", command, "--group-id", id, "--ip-permissions", &permissions],
            )
            .await?;
        }
        Ok(())
    }

    async fn delete_security_group(&self, scope: &ReclaimScope, id: &str) -> Result<()> {
        tracing::info!(sg = %id, "Deleting security group");
        self.run_idempotent(
            &scope.region,
            &["ec2", "delete-security-group", "--group-id", id],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parse_json;

    #[test]
    fn test_parse_instances() {
        let stdout = r#"{
            "Reservations": [
                {"Instances": [
                    {"InstanceId": "i-1", "State": {"Code": 16, "Name": "running"},
                     "Tags": [{"Key": "kubernetes.io/cluster/prod", "Value": "shared"}]},
                    {"InstanceId": "i-2", "State": {"Code": 80, "Name": "stopped"}}
                ]}
            ]
        }"#;
        let parsed: Reservations = parse_json("aws ec2 describe-instances", stdout).unwrap();
        let resources: Vec<TaggedResource> = parsed
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .map(|i| i.into_resource("prod"))
            .collect();

        assert_eq!(resources[0], TaggedResource::new("i-1", "shared", "running"));
        assert_eq!(resources[1], TaggedResource::new("i-2", "owned", "stopped"));
    }

    #[test]
    fn test_parse_network_interfaces() {
        let stdout = r#"{
            "NetworkInterfaces": [
                {"NetworkInterfaceId": "eni-1", "Status": "in-use", "RequesterManaged": false,
                 "Attachment": {"AttachmentId": "eni-attach-1", "Status": "attached"},
                 "TagSet": [{"Key": "cluster.k8s.amazonaws.com/name", "Value": "prod"}]},
                {"NetworkInterfaceId": "eni-2", "Status": "in-use", "RequesterManaged": true,
                 "Attachment": {"AttachmentId": "eni-attach-2"}}
            ]
        }"#;
        let parsed: NetworkInterfaces =
            parse_json("aws ec2 describe-network-interfaces", stdout).unwrap();
        let interfaces: Vec<NetworkInterface> = parsed
            .network_interfaces
            .into_iter()
            .map(|e| e.into_interface("prod"))
            .collect();

        assert_eq!(interfaces[0].attachment_id.as_deref(), Some("eni-attach-1"));
        assert_eq!(interfaces[0].resource.owner_tag, "prod");
        assert!(!interfaces[0].requester_managed);
        assert!(interfaces[1].requester_managed);
    }

    #[test]
    fn test_parse_security_group_rules() {
        let stdout = r#"{
            "SecurityGroups": [{
                "GroupId": "sg-1", "GroupName": "k8s-traffic-prod-abc",
                "IpPermissions": [{"IpProtocol": "-1",
                    "UserIdGroupPairs": [{"GroupId": "sg-2", "UserId": "123"}]}],
                "IpPermissionsEgress": []
            }]
        }"#;
        let parsed: SecurityGroups = parse_json("aws ec2 describe-security-groups", stdout).unwrap();
        let group = &parsed.security_groups[0];
        assert_eq!(group.group_id, "sg-1");
        assert_eq!(group.ip_permissions.len(), 1);
        assert!(group.ip_permissions_egress.is_empty());
        assert!(group.tags.is_empty());
    }

    #[test]
    fn test_parse_load_balancer_tags() {
        let stdout = r#"{
            "TagDescriptions": [
                {"ResourceArn": "arn:lb/1", "Tags": [{"Key": "elbv2.k8s.aws/cluster", "Value": "prod"}]},
                {"ResourceArn": "arn:lb/2", "Tags": [{"Key": "team", "Value": "web"}]}
            ]
        }"#;
        let parsed: TagDescriptions = parse_json("aws elbv2 describe-tags", stdout).unwrap();
        let owned: Vec<&str> = parsed
            .tag_descriptions
            .iter()
            .filter(|d| tags::owner_of(&d.tags, "prod").is_some())
            .map(|d| d.resource_arn.as_str())
            .collect();
        assert_eq!(owned, vec!["arn:lb/1"]);
    }
}
