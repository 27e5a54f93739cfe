use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tokio::time::{self, Duration};
use tracing::{error, info, warn};

use crate::error::{ApiError, SourceError};
use crate::models::views::{ClusterOverview, NodeSummary, PodDetail, PodMetrics, PodSummary};
use crate::normalize;

use super::ClusterSource;

const MAX_POD_NAME_LEN: usize = 253;

/// Fetches raw records from a [`ClusterSource`] and turns them into
/// reporting records. Holds no data between requests.
pub struct Aggregator {
    source: Option<Arc<dyn ClusterSource>>,
    cluster_name: String,
    namespace: String,
    probe: Mutex<ProbeState>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeState {
    pub connected: bool,
    pub last_ping: Option<DateTime<Utc>>,
}

impl Aggregator {
    /// `source` is `None` when no orchestrator client could be built;
    /// every data call then fails with [`ApiError::Unavailable`].
    pub fn new(
        source: Option<Arc<dyn ClusterSource>>,
        cluster_name: String,
        namespace: String,
    ) -> Self {
        let probe = ProbeState {
            connected: source.is_some(),
            last_ping: None,
        };
        Self {
            source,
            cluster_name,
            namespace,
            probe: Mutex::new(probe),
        }
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn probe_state(&self) -> ProbeState {
        match self.probe.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn source(&self) -> Result<&Arc<dyn ClusterSource>, ApiError> {
        self.source.as_ref().ok_or(ApiError::Unavailable)
    }

    pub async fn pods(&self, now: DateTime<Utc>) -> Result<Vec<PodSummary>, ApiError> {
        let pods = self
            .source()?
            .list_pods(Some(&self.namespace))
            .await
            .map_err(|e| upstream("pods", e))?;

        Ok(pods.iter().map(|p| normalize::summarize_pod(p, now)).collect())
    }

    pub async fn pod_detail(&self, name: &str) -> Result<PodDetail, ApiError> {
        let source = self.source()?;
        check_pod_name(name)?;
        let pod = source
            .get_pod(&self.namespace, name)
            .await
            .map_err(|e| upstream("pod", e))?;
        let events = source
            .list_pod_events(&self.namespace, name)
            .await
            .map_err(|e| upstream("events", e))?;

        Ok(normalize::assemble_pod_detail(&pod, &events))
    }

    pub async fn pod_logs(
        &self,
        name: &str,
        tail_lines: u32,
        container: Option<&str>,
    ) -> Result<String, ApiError> {
        let source = self.source()?;
        check_pod_name(name)?;
        let logs = source
            .get_pod_logs(&self.namespace, name, tail_lines, container)
            .await;

        // A status answer from the API server means the parameters were
        // refused (unknown container, pod not started yet).
        logs.map_err(|e| match e {
            e @ SourceError::Rejected { .. } => ApiError::BadRequest(e.to_string()),
            e => upstream("logs", e),
        })
    }

    pub async fn metrics(&self) -> Result<Vec<PodMetrics>, ApiError> {
        let usage = self
            .source()?
            .list_pod_usage(&self.namespace)
            .await
            .map_err(|e| upstream("metrics", e))?;

        Ok(normalize::aggregate_metrics(&usage))
    }

    pub async fn nodes(&self) -> Result<Vec<NodeSummary>, ApiError> {
        let nodes = self
            .source()?
            .list_nodes()
            .await
            .map_err(|e| upstream("nodes", e))?;

        Ok(nodes.iter().map(normalize::summarize_node).collect())
    }

    pub async fn cluster_overview(&self) -> Result<ClusterOverview, ApiError> {
        let source = self.source()?;
        let (pods, nodes, namespaces) = tokio::try_join!(
            source.list_pods(None),
            source.list_nodes(),
            source.count_namespaces(),
        )
        .map_err(|e| upstream("cluster overview", e))?;

        Ok(normalize::summarize_cluster(
            &self.cluster_name,
            &pods,
            &nodes,
            namespaces,
        ))
    }

    pub async fn run_health_checker(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: tokio::sync::watch::Receiver<()>,
    ) {
        if self.source.is_none() {
            return;
        }

        // Initial check
        self.ping().await;

        let mut interval = time::interval(period);
        interval.tick().await; // skip first immediate tick

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.ping().await;
                }
                _ = shutdown.changed() => {
                    info!("health checker shutting down");
                    return;
                }
            }
        }
    }

    async fn ping(&self) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        let result = source.ping().await;

        let mut state = match self.probe.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        match result {
            Ok(()) => {
                if !state.connected {
                    info!("connection to cluster {} restored", self.cluster_name);
                }
                state.connected = true;
                state.last_ping = Some(Utc::now());
            }
            Err(e) => {
                warn!("health check failed for cluster {}: {}", self.cluster_name, e);
                state.connected = false;
            }
        }
    }
}

/// Pod names are DNS-1123 subdomains.
fn check_pod_name(name: &str) -> Result<(), ApiError> {
    let valid_chars = name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.');
    let alnum_ends =
        |b: Option<&u8>| b.is_some_and(|b| b.is_ascii_lowercase() || b.is_ascii_digit());

    if name.len() <= MAX_POD_NAME_LEN
        && valid_chars
        && alnum_ends(name.as_bytes().first())
        && alnum_ends(name.as_bytes().last())
    {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("invalid pod name {:?}", name)))
    }
}

/// Log a failed listing and convert it for the HTTP boundary.
fn upstream(what: &str, e: SourceError) -> ApiError {
    match e {
        SourceError::Upstream(ref msg) => error!("error fetching {}: {}", what, msg),
        SourceError::Rejected { .. } => error!("error fetching {}: {}", what, e),
        SourceError::MetricsUnavailable => warn!("metrics API not available"),
        SourceError::NotFound(_) => {}
    }
    e.into()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::k8s::{
        ContainerStatus, ContainerUsage, Event, Node, NodeCondition, ObjectReference, Pod,
        PodUsage, ResourceUsage,
    };
    use async_trait::async_trait;

    /// In-memory cluster used by the aggregator and router tests.
    #[derive(Default)]
    pub(crate) struct FakeCluster {
        pub pods: Vec<Pod>,
        pub nodes: Vec<Node>,
        pub events: Vec<Event>,
        pub namespaces: usize,
        pub usage: Option<Vec<PodUsage>>,
        pub logs: String,
        pub fail_nodes: bool,
        pub fail_logs: bool,
    }

    impl FakeCluster {
        pub fn sample() -> Self {
            let mut web = Pod::default();
            web.metadata.name = "web".to_string();
            web.metadata.namespace = "default".to_string();
            web.metadata.creation_timestamp = Some(Utc::now() - chrono::Duration::hours(3));
            web.status.phase = Some("Running".to_string());
            web.status.container_statuses = vec![ContainerStatus {
                name: "nginx".to_string(),
                ready: true,
                restart_count: 2,
            }];

            let mut system = Pod::default();
            system.metadata.name = "coredns".to_string();
            system.metadata.namespace = "kube-system".to_string();
            system.status.phase = Some("Pending".to_string());

            let mut node = Node::default();
            node.metadata.name = "kind-control-plane".to_string();
            node.status.conditions = vec![NodeCondition {
                condition_type: "Ready".to_string(),
                status: "True".to_string(),
            }];

            let events = (0..7)
                .map(|i| Event {
                    reason: Some(format!("reason-{}", i)),
                    involved_object: ObjectReference {
                        kind: "Pod".to_string(),
                        name: "web".to_string(),
                        namespace: "default".to_string(),
                    },
                    ..Default::default()
                })
                .collect();

            let mut usage = PodUsage::default();
            usage.metadata.name = "web".to_string();
            usage.containers = vec![ContainerUsage {
                name: "nginx".to_string(),
                usage: ResourceUsage {
                    cpu: "1500000n".to_string(),
                    memory: "3Mi".to_string(),
                },
            }];

            Self {
                pods: vec![web, system],
                nodes: vec![node],
                events,
                namespaces: 4,
                usage: Some(vec![usage]),
                logs: "line 1\nline 2\n".to_string(),
                fail_nodes: false,
                fail_logs: false,
            }
        }
    }

    #[async_trait]
    impl ClusterSource for FakeCluster {
        async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>, SourceError> {
            Ok(self
                .pods
                .iter()
                .filter(|p| namespace.is_none_or(|ns| p.metadata.namespace == ns))
                .cloned()
                .collect())
        }

        async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, SourceError> {
            self.pods
                .iter()
                .find(|p| p.metadata.namespace == namespace && p.metadata.name == name)
                .cloned()
                .ok_or_else(|| SourceError::NotFound(format!("pod {:?}", name)))
        }

        async fn list_pod_events(
            &self,
            _namespace: &str,
            name: &str,
        ) -> Result<Vec<Event>, SourceError> {
            Ok(self
                .events
                .iter()
                .filter(|e| e.involved_object.name == name)
                .cloned()
                .collect())
        }

        async fn list_nodes(&self) -> Result<Vec<Node>, SourceError> {
            if self.fail_nodes {
                return Err(SourceError::Upstream("connection refused".to_string()));
            }
            Ok(self.nodes.clone())
        }

        async fn count_namespaces(&self) -> Result<usize, SourceError> {
            Ok(self.namespaces)
        }

        async fn get_pod_logs(
            &self,
            namespace: &str,
            name: &str,
            tail_lines: u32,
            container: Option<&str>,
        ) -> Result<String, SourceError> {
            if self.fail_logs {
                return Err(SourceError::Upstream("operation timed out".to_string()));
            }
            self.get_pod(namespace, name).await?;
            if container == Some("missing") {
                return Err(SourceError::Rejected {
                    what: format!("pod {:?}", name),
                    status: 400,
                    body: "container missing is not valid for pod web".to_string(),
                });
            }
            let lines: Vec<&str> = self.logs.lines().collect();
            let start = lines.len().saturating_sub(tail_lines as usize);
            Ok(lines[start..].join("\n"))
        }

        async fn list_pod_usage(&self, _namespace: &str) -> Result<Vec<PodUsage>, SourceError> {
            self.usage.clone().ok_or(SourceError::MetricsUnavailable)
        }

        async fn ping(&self) -> Result<(), SourceError> {
            Ok(())
        }
    }

    fn aggregator(fake: FakeCluster) -> Aggregator {
        Aggregator::new(
            Some(Arc::new(fake)),
            "kind-pulsecheck".to_string(),
            "default".to_string(),
        )
    }

    #[tokio::test]
    async fn test_pods_scoped_to_namespace() {
        let agg = aggregator(FakeCluster::sample());
        let pods = agg.pods(Utc::now()).await.unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].name, "web");
        assert_eq!(pods[0].ready, "1/1");
        assert_eq!(pods[0].restarts, 2);
        assert_eq!(pods[0].age, "3h");
    }

    #[tokio::test]
    async fn test_pod_detail_and_not_found() {
        let agg = aggregator(FakeCluster::sample());
        let detail = agg.pod_detail("web").await.unwrap();
        assert_eq!(detail.events.len(), 5);
        assert_eq!(detail.events[0].reason.as_deref(), Some("reason-0"));

        assert!(matches!(
            agg.pod_detail("nope").await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cluster_overview_spans_namespaces() {
        let agg = aggregator(FakeCluster::sample());
        let overview = agg.cluster_overview().await.unwrap();
        assert_eq!(overview.cluster_name, "kind-pulsecheck");
        assert_eq!(overview.pods.total, 2);
        assert_eq!(overview.pods.by_status["Pending"], 1);
        assert_eq!(overview.nodes.ready, 1);
        assert_eq!(overview.namespaces, 4);
    }

    #[tokio::test]
    async fn test_listing_failure_is_wholesale() {
        let mut fake = FakeCluster::sample();
        fake.fail_nodes = true;
        let agg = aggregator(fake);
        assert!(matches!(agg.nodes().await, Err(ApiError::Upstream(_))));
        assert!(matches!(
            agg.cluster_overview().await,
            Err(ApiError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_metrics_unavailable_is_distinct() {
        let mut fake = FakeCluster::sample();
        fake.usage = None;
        let agg = aggregator(fake);
        assert!(matches!(
            agg.metrics().await,
            Err(ApiError::MetricsUnavailable)
        ));

        let agg = aggregator(FakeCluster {
            usage: Some(Vec::new()),
            ..FakeCluster::sample()
        });
        assert!(agg.metrics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_log_errors() {
        let agg = aggregator(FakeCluster::sample());
        assert_eq!(agg.pod_logs("web", 1, None).await.unwrap(), "line 2");
        assert!(matches!(
            agg.pod_logs("web", 10, Some("missing")).await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            agg.pod_logs("ghost", 10, None).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_log_transport_failure_is_not_a_bad_request() {
        let agg = aggregator(FakeCluster {
            fail_logs: true,
            ..FakeCluster::sample()
        });
        let err = agg.pod_logs("web", 10, None).await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_malformed_pod_names_are_rejected() {
        let agg = aggregator(FakeCluster::sample());
        for name in ["../x?y", "a/b", "web?container=x", "Web", "-web", "web.", ""] {
            assert!(
                matches!(agg.pod_detail(name).await, Err(ApiError::BadRequest(_))),
                "{}",
                name
            );
            assert!(
                matches!(
                    agg.pod_logs(name, 10, None).await,
                    Err(ApiError::BadRequest(_))
                ),
                "{}",
                name
            );
        }

        let long = "a".repeat(MAX_POD_NAME_LEN + 1);
        assert!(matches!(agg.pod_detail(&long).await, Err(ApiError::BadRequest(_))));
        assert!(check_pod_name(&"a".repeat(MAX_POD_NAME_LEN)).is_ok());
        assert!(check_pod_name("web-7d4b9.canary").is_ok());
    }

    #[tokio::test]
    async fn test_without_source_everything_is_unavailable() {
        let agg = Aggregator::new(None, "c".to_string(), "default".to_string());
        assert!(!agg.probe_state().connected);
        assert!(matches!(agg.pods(Utc::now()).await, Err(ApiError::Unavailable)));
        assert!(matches!(agg.nodes().await, Err(ApiError::Unavailable)));
        assert!(matches!(agg.metrics().await, Err(ApiError::Unavailable)));
        assert!(matches!(
            agg.cluster_overview().await,
            Err(ApiError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_ping_records_last_success() {
        let agg = aggregator(FakeCluster::sample());
        assert!(agg.probe_state().last_ping.is_none());
        agg.ping().await;
        let state = agg.probe_state();
        assert!(state.connected);
        assert!(state.last_ping.is_some());
    }
}
