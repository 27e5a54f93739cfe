use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: u32,
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,
    #[serde(default = "default_stream_interval_secs")]
    pub stream_interval_secs: u64,
    #[serde(default)]
    pub orchestrator: Option<OrchestratorConfig>,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_cluster_name() -> String {
    "kind-pulsecheck".to_string()
}

fn default_listen_port() -> u16 {
    8000
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_log_tail_lines() -> u32 {
    100
}

fn default_health_interval_secs() -> u64 {
    15
}

fn default_stream_interval_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        let mut cfg: Config = serde_yaml::from_str(data)?;

        if let Some(ref mut o) = cfg.orchestrator {
            o.base_url = o.base_url.trim_end_matches('/').to_string();
        }

        Ok(cfg)
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.listen_port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors.allowed_origins.iter().any(|o| o == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::parse("{}").unwrap();
        assert_eq!(cfg.cluster_name, "kind-pulsecheck");
        assert_eq!(cfg.listen_addr(), "0.0.0.0:8000");
        assert_eq!(cfg.namespace, "default");
        assert_eq!(cfg.log_tail_lines, 100);
        assert_eq!(cfg.health_interval_secs, 15);
        assert_eq!(cfg.stream_interval_secs, 5);
        assert!(cfg.orchestrator.is_none());
        assert!(cfg.allows_any_origin());
    }

    #[test]
    fn test_full_config() {
        let cfg = Config::parse(
            r#"
cluster_name: staging
listen_port: 9000
namespace: apps
orchestrator:
  base_url: https://10.0.0.1:6443/
  token_file: /var/run/secrets/kubernetes.io/serviceaccount/token
  insecure_skip_tls_verify: true
cors:
  allowed_origins:
    - http://localhost:3000
"#,
        )
        .unwrap();

        assert_eq!(cfg.cluster_name, "staging");
        assert_eq!(cfg.listen_addr(), "0.0.0.0:9000");
        assert_eq!(cfg.namespace, "apps");
        let o = cfg.orchestrator.as_ref().unwrap();
        assert_eq!(o.base_url, "https://10.0.0.1:6443");
        assert!(o.insecure_skip_tls_verify);
        assert_eq!(o.timeout_secs, 10);
        assert!(o.token.is_none());
        assert!(!cfg.allows_any_origin());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            Config::parse("listen_port: not-a-port"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/pulsecheck.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/pulsecheck.yaml"));
    }
}
