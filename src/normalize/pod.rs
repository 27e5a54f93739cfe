use chrono::{DateTime, Utc};

use crate::models::k8s::{Container, Event, Pod};
use crate::models::views::{ContainerInfo, EventInfo, PodDetail, PodSummary, PortInfo};

use super::age::format_age;

pub const MAX_DETAIL_EVENTS: usize = 5;

const UNKNOWN_PHASE: &str = "Unknown";

/// Phase reported for a pod, with absent or blank phases reported as `Unknown`.
pub fn pod_phase(pod: &Pod) -> &str {
    match pod.status.phase.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => UNKNOWN_PHASE,
    }
}

pub fn summarize_pod(pod: &Pod, now: DateTime<Utc>) -> PodSummary {
    let statuses = &pod.status.container_statuses;
    let ready = statuses.iter().filter(|c| c.ready).count();
    let restarts = statuses.iter().map(|c| u64::from(c.restart_count)).sum();

    let created = pod.metadata.creation_timestamp;
    let age = format_age(created.unwrap_or(now), now);

    PodSummary {
        name: pod.metadata.name.clone(),
        namespace: pod.metadata.namespace.clone(),
        status: pod_phase(pod).to_string(),
        ready: format!("{}/{}", ready, statuses.len()),
        restarts,
        age,
        node: non_empty(&pod.spec.node_name),
        ip: non_empty(&pod.status.pod_ip),
        created_at: created.map(|t| t.to_rfc3339()),
    }
}

/// Build the detail view of a pod from the pod and its events.
///
/// Events are kept in the order given, capped at [`MAX_DETAIL_EVENTS`].
/// Events that name a different involved object are skipped.
pub fn assemble_pod_detail(pod: &Pod, events: &[Event]) -> PodDetail {
    let name = &pod.metadata.name;

    let events = events
        .iter()
        .filter(|e| e.involved_object.name.is_empty() || e.involved_object.name == *name)
        .take(MAX_DETAIL_EVENTS)
        .map(event_info)
        .collect();

    PodDetail {
        name: name.clone(),
        namespace: pod.metadata.namespace.clone(),
        status: pod_phase(pod).to_string(),
        node: non_empty(&pod.spec.node_name),
        ip: non_empty(&pod.status.pod_ip),
        labels: pod.metadata.labels.clone(),
        containers: pod.spec.containers.iter().map(container_info).collect(),
        events,
    }
}

fn container_info(c: &Container) -> ContainerInfo {
    ContainerInfo {
        name: c.name.clone(),
        image: c.image.clone(),
        ports: c
            .ports
            .iter()
            .map(|p| PortInfo {
                container_port: p.container_port,
                protocol: p.protocol.clone(),
            })
            .collect(),
    }
}

fn event_info(e: &Event) -> EventInfo {
    EventInfo {
        event_type: e.event_type.clone(),
        reason: e.reason.clone(),
        message: e.message.clone(),
        timestamp: e.last_timestamp.or(e.event_time).map(|t| t.to_rfc3339()),
    }
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_ref().filter(|s| !s.is_empty()).cloned()
}
