use std::collections::BTreeMap;

use crate::models::k8s::Node;
use crate::models::views::NodeSummary;

pub const ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";
pub const DEFAULT_ROLE: &str = "worker";

/// A node is ready iff its `Ready` condition has status `"True"`.
pub fn is_node_ready(node: &Node) -> bool {
    node.status
        .conditions
        .iter()
        .any(|c| c.condition_type == "Ready" && c.status == "True")
}

/// Roles from `node-role.kubernetes.io/<role>` label keys, sorted.
/// Falls back to a single `worker` role when no such label is set.
pub fn node_roles(node: &Node) -> Vec<String> {
    let roles: Vec<String> = node
        .metadata
        .labels
        .keys()
        .filter_map(|k| k.strip_prefix(ROLE_LABEL_PREFIX))
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();

    if roles.is_empty() {
        vec![DEFAULT_ROLE.to_string()]
    } else {
        roles
    }
}

pub fn summarize_node(node: &Node) -> NodeSummary {
    let conditions: BTreeMap<String, String> = node
        .status
        .conditions
        .iter()
        .map(|c| (c.condition_type.clone(), c.status.clone()))
        .collect();

    let info = node.status.node_info.clone().unwrap_or_default();
    let status = if is_node_ready(node) { "Ready" } else { "NotReady" };

    NodeSummary {
        name: node.metadata.name.clone(),
        status: status.to_string(),
        roles: node_roles(node),
        version: info.kubelet_version,
        os: format!(
            "{}/{}",
            or_unknown(&info.operating_system),
            or_unknown(&info.architecture)
        ),
        container_runtime: info.container_runtime_version,
        conditions,
    }
}

fn or_unknown(s: &str) -> &str {
    if s.is_empty() { "unknown" } else { s }
}
