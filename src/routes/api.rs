use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use chrono::Utc;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::models::views::*;

pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let probe = state.aggregator.probe_state();
    Json(HealthResponse {
        status: "ok".to_string(),
        kubernetes_connected: probe.connected,
        cluster: state.aggregator.cluster_name().to_string(),
        last_ping: probe.last_ping,
    })
}

pub async fn handle_list_pods(
    State(state): State<AppState>,
) -> Result<Json<PodListResponse>, ApiError> {
    let pods = state.aggregator.pods(Utc::now()).await?;
    Ok(Json(PodListResponse {
        count: pods.len(),
        pods,
    }))
}

pub async fn handle_get_pod(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PodDetail>, ApiError> {
    Ok(Json(state.aggregator.pod_detail(&name).await?))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub tail: Option<u32>,
    pub container: Option<String>,
}

pub async fn handle_get_pod_logs(
    State(state): State<AppState>,
    Path(name): Path<String>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> Result<Json<PodLogsResponse>, ApiError> {
    let Query(q) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let lines = q.tail.unwrap_or(state.config.log_tail_lines);
    let container = q.container.filter(|c| !c.is_empty());

    let logs = state
        .aggregator
        .pod_logs(&name, lines, container.as_deref())
        .await?;

    Ok(Json(PodLogsResponse {
        pod: name,
        container,
        lines,
        logs,
    }))
}

pub async fn handle_metrics(
    State(state): State<AppState>,
) -> Result<Json<MetricsListResponse>, ApiError> {
    let metrics = state.aggregator.metrics().await?;
    Ok(Json(MetricsListResponse {
        count: metrics.len(),
        metrics,
    }))
}

pub async fn handle_list_nodes(
    State(state): State<AppState>,
) -> Result<Json<NodeListResponse>, ApiError> {
    let nodes = state.aggregator.nodes().await?;
    Ok(Json(NodeListResponse {
        count: nodes.len(),
        nodes,
    }))
}

pub async fn handle_cluster_overview(
    State(state): State<AppState>,
) -> Result<Json<ClusterOverview>, ApiError> {
    Ok(Json(state.aggregator.cluster_overview().await?))
}
