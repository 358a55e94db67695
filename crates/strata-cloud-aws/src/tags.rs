//! Tag keys and filters that mark cluster ownership

use strata_cloud::GroupCriterion;

/// `kubernetes.io/cluster/<id>` = `owned` | `shared`
pub fn cluster_tag_key(cluster_id: &str) -> String {
    format!("kubernetes.io/cluster/{}", cluster_id)
}

/// Set by the VPC CNI on the interfaces it creates
pub const CNI_CLUSTER_TAG: &str = "cluster.k8s.amazonaws.com/name";

/// Set by the load-balancer controller on load balancers and groups it creates
pub const LB_CONTROLLER_CLUSTER_TAG: &str = "elbv2.k8s.aws/cluster";

/// ec2 `--filters` entry for the cluster ownership tag
pub fn cluster_owned_filter(cluster_id: &str) -> String {
    format!("Name=tag:{},Values=owned,shared", cluster_tag_key(cluster_id))
}

/// ec2 `--filters` entry for the given security-group criterion
pub fn group_filter(criterion: GroupCriterion, cluster_id: &str) -> String {
    match criterion {
        GroupCriterion::ClusterOwned => cluster_owned_filter(cluster_id),
        GroupCriterion::LoadBalancerController => {
            format!("Name=tag:{},Values={}", LB_CONTROLLER_CLUSTER_TAG, cluster_id)
        }
        GroupCriterion::BackendNaming => {
            format!("Name=group-name,Values=k8s-traffic-{}-*", cluster_id)
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Owner value if `tags` mark the resource as belonging to `cluster_id`
pub fn owner_of(tags: &[Tag], cluster_id: &str) -> Option<String> {
    let cluster_key = cluster_tag_key(cluster_id);
    tags.iter().find_map(|tag| {
        if tag.key == cluster_key {
            return Some(tag.value.clone());
        }
        let by_value = tag.key == LB_CONTROLLER_CLUSTER_TAG || tag.key == CNI_CLUSTER_TAG;
        (by_value && tag.value == cluster_id).then(|| cluster_id.to_string())
    })
}
