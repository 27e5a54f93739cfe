use std::collections::BTreeMap;

use crate::models::k8s::{Node, Pod};
use crate::models::views::{ClusterOverview, NodeTally, PodTally};

use super::node::is_node_ready;
use super::pod::pod_phase;

/// Phases that always appear in the tally, even at zero.
pub const KNOWN_PHASES: [&str; 5] = ["Running", "Pending", "Failed", "Succeeded", "Unknown"];

pub fn tally_phases(pods: &[Pod]) -> BTreeMap<String, usize> {
    let mut by_status: BTreeMap<String, usize> =
        KNOWN_PHASES.iter().map(|p| (p.to_string(), 0)).collect();

    for pod in pods {
        *by_status.entry(pod_phase(pod).to_string()).or_insert(0) += 1;
    }
    by_status
}

pub fn summarize_cluster(
    cluster_name: &str,
    pods: &[Pod],
    nodes: &[Node],
    namespaces: usize,
) -> ClusterOverview {
    let ready = nodes.iter().filter(|n| is_node_ready(n)).count();

    ClusterOverview {
        cluster_name: cluster_name.to_string(),
        nodes: NodeTally {
            total: nodes.len(),
            ready,
        },
        pods: PodTally {
            total: pods.len(),
            by_status: tally_phases(pods),
        },
        namespaces,
    }
}
