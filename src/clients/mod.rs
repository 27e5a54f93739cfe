pub mod aggregator;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::config::OrchestratorConfig;
use crate::error::SourceError;
use crate::models::k8s::{Event, List, Namespace, Node, Pod, PodUsage};

const METRICS_GROUP: &str = "metrics.k8s.io";
const METRICS_VERSION: &str = "v1beta1";

/// Read access to the cluster. Every call fetches a fresh snapshot.
#[async_trait]
pub trait ClusterSource: Send + Sync {
    /// Pods in `namespace`, or in every namespace when `None`.
    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>, SourceError>;

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, SourceError>;

    /// Events whose involved object is named `name`.
    async fn list_pod_events(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<Event>, SourceError>;

    async fn list_nodes(&self) -> Result<Vec<Node>, SourceError>;

    async fn count_namespaces(&self) -> Result<usize, SourceError>;

    async fn get_pod_logs(
        &self,
        namespace: &str,
        name: &str,
        tail_lines: u32,
        container: Option<&str>,
    ) -> Result<String, SourceError>;

    /// Per-container usage samples from the metrics API. Fails with
    /// [`SourceError::MetricsUnavailable`] when the API is not served.
    async fn list_pod_usage(&self, namespace: &str) -> Result<Vec<PodUsage>, SourceError>;

    async fn ping(&self) -> Result<(), SourceError>;
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("reading token file {}: {source}", path.display())]
    TokenFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("building HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// [`ClusterSource`] backed by the Kubernetes REST API.
pub struct KubeClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl KubeClient {
    pub fn new(cfg: &OrchestratorConfig) -> Result<Self, ClientError> {
        let token = match (&cfg.token, &cfg.token_file) {
            (Some(t), _) => Some(t.trim().to_string()),
            (None, Some(path)) => {
                let t = std::fs::read_to_string(path).map_err(|source| ClientError::TokenFile {
                    path: path.clone(),
                    source,
                })?;
                Some(t.trim().to_string())
            }
            (None, None) => None,
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .danger_accept_invalid_certs(cfg.insecure_skip_tls_verify)
            .build()?;

        Ok(Self {
            base_url: cfg.base_url.clone(),
            token,
            http,
        })
    }

    /// Append `segments` to the base URL. Each segment is percent-encoded,
    /// so a name can never add path components or a query.
    fn url(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SourceError::Upstream(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Upstream(format!("invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Response, SourceError> {
        let mut req = self.http.get(self.url(segments)?).query(query);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        Ok(req.send().await?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, SourceError> {
        let resp = self.get(segments, query).await?;
        let resp = check_status(resp, what).await?;
        Ok(resp.json().await?)
    }
}

/// Map a non-success response onto a [`SourceError`].
async fn check_status(resp: Response, what: &str) -> Result<Response, SourceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(status, what, &body))
}

fn status_error(status: StatusCode, what: &str, body: &str) -> SourceError {
    if status == StatusCode::NOT_FOUND {
        SourceError::NotFound(what.to_string())
    } else {
        SourceError::Rejected {
            what: what.to_string(),
            status: status.as_u16(),
            body: body.trim().to_string(),
        }
    }
}

#[async_trait]
impl ClusterSource for KubeClient {
    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>, SourceError> {
        let list: List<Pod> = match namespace {
            Some(ns) => {
                self.get_json(&["api", "v1", "namespaces", ns, "pods"], &[], "pods")
                    .await?
            }
            None => self.get_json(&["api", "v1", "pods"], &[], "pods").await?,
        };
        Ok(list.items)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, SourceError> {
        self.get_json(
            &["api", "v1", "namespaces", namespace, "pods", name],
            &[],
            &format!("pod {:?}", name),
        )
        .await
    }

    async fn list_pod_events(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<Event>, SourceError> {
        let list: List<Event> = self
            .get_json(
                &["api", "v1", "namespaces", namespace, "events"],
                &[("fieldSelector", format!("involvedObject.name={}", name))],
                "events",
            )
            .await?;
        Ok(list.items)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, SourceError> {
        let list: List<Node> = self.get_json(&["api", "v1", "nodes"], &[], "nodes").await?;
        Ok(list.items)
    }

    async fn count_namespaces(&self) -> Result<usize, SourceError> {
        let list: List<Namespace> = self
            .get_json(&["api", "v1", "namespaces"], &[], "namespaces")
            .await?;
        Ok(list.items.len())
    }

    async fn get_pod_logs(
        &self,
        namespace: &str,
        name: &str,
        tail_lines: u32,
        container: Option<&str>,
    ) -> Result<String, SourceError> {
        let mut query = vec![("tailLines", tail_lines.to_string())];
        if let Some(c) = container {
            query.push(("container", c.to_string()));
        }

        let resp = self
            .get(
                &["api", "v1", "namespaces", namespace, "pods", name, "log"],
                &query,
            )
            .await?;
        let resp = check_status(resp, &format!("pod {:?}", name)).await?;
        Ok(resp.text().await?)
    }

    async fn list_pod_usage(&self, namespace: &str) -> Result<Vec<PodUsage>, SourceError> {
        let resp = self
            .get(
                &[
                    "apis",
                    METRICS_GROUP,
                    METRICS_VERSION,
                    "namespaces",
                    namespace,
                    "pods",
                ],
                &[],
            )
            .await?;

        // The aggregated API answers 404 or 503 when metrics-server is absent.
        if matches!(
            resp.status(),
            StatusCode::NOT_FOUND | StatusCode::SERVICE_UNAVAILABLE
        ) {
            return Err(SourceError::MetricsUnavailable);
        }

        let resp = check_status(resp, "pod metrics").await?;
        let list: List<PodUsage> = resp.json().await?;
        Ok(list.items)
    }

    async fn ping(&self) -> Result<(), SourceError> {
        let resp = self.get(&["version"], &[]).await?;
        check_status(resp, "version").await?;
        Ok(())
    }
}
