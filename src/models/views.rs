use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PodSummary {
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub ready: String,
    pub restarts: u64,
    pub age: String,
    pub node: Option<String>,
    pub ip: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PodDetail {
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub node: Option<String>,
    pub ip: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub containers: Vec<ContainerInfo>,
    pub events: Vec<EventInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerInfo {
    pub name: String,
    pub image: String,
    pub ports: Vec<PortInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortInfo {
    pub container_port: i32,
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventInfo {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeSummary {
    pub name: String,
    pub status: String,
    pub roles: Vec<String>,
    pub version: String,
    pub os: String,
    pub container_runtime: String,
    pub conditions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PodMetrics {
    pub pod: String,
    pub cpu: String,
    pub cpu_millicores: u64,
    pub memory: String,
    pub memory_mb: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterOverview {
    pub cluster_name: String,
    pub nodes: NodeTally,
    pub pods: PodTally,
    pub namespaces: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeTally {
    pub total: usize,
    pub ready: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PodTally {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
}

// --- Response envelopes ---

#[derive(Debug, Serialize)]
pub struct PodListResponse {
    pub pods: Vec<PodSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct NodeListResponse {
    pub nodes: Vec<NodeSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MetricsListResponse {
    pub metrics: Vec<PodMetrics>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct PodLogsResponse {
    pub pod: String,
    pub container: Option<String>,
    pub lines: u32,
    pub logs: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub kubernetes_connected: bool,
    pub cluster: String,
    pub last_ping: Option<DateTime<Utc>>,
}
