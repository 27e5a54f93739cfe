mod clients;
mod config;
mod error;
mod models;
mod normalize;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use clients::aggregator::Aggregator;
use clients::{ClusterSource, KubeClient};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub config: Arc<config::Config>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pulsecheck=info")),
        )
        .init();

    let config_path = std::env::args()
        .skip(1)
        .zip(std::env::args().skip(2))
        .find_map(|(k, v)| {
            if k == "-config" || k == "--config" {
                Some(v)
            } else {
                None
            }
        })
        .or_else(|| std::env::args().nth(1).filter(|a| !a.starts_with('-')))
        .unwrap_or_else(|| "/etc/pulsecheck/config.yaml".to_string());

    let cfg = config::Config::load(&PathBuf::from(&config_path)).unwrap_or_else(|e| {
        eprintln!("error loading config: {}", e);
        std::process::exit(1);
    });

    let source = connect(&cfg);
    let aggregator = Arc::new(Aggregator::new(
        source,
        cfg.cluster_name.clone(),
        cfg.namespace.clone(),
    ));
    let cfg = Arc::new(cfg);

    // Shutdown signal
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());

    // Start health checker
    let agg_clone = aggregator.clone();
    let period = Duration::from_secs(cfg.health_interval_secs.max(1));
    tokio::spawn(async move {
        agg_clone.run_health_checker(period, shutdown_rx).await;
    });

    let state = AppState {
        aggregator,
        config: cfg.clone(),
    };

    let router = routes::build_router(state);

    let listen_addr = cfg.listen_addr();
    let listener = TcpListener::bind(&listen_addr).await.unwrap_or_else(|e| {
        eprintln!("failed to bind {}: {}", listen_addr, e);
        std::process::exit(1);
    });

    info!("pulsecheck listening on {}", listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(());
        })
        .await
        .unwrap_or_else(|e| {
            eprintln!("server error: {}", e);
            std::process::exit(1);
        });
}

/// Build the orchestrator client. Failure leaves the service running in
/// the unavailable state rather than exiting.
fn connect(cfg: &config::Config) -> Option<Arc<dyn ClusterSource>> {
    let Some(ref o) = cfg.orchestrator else {
        warn!("no orchestrator configured, serving 503 for cluster data");
        return None;
    };

    match KubeClient::new(o) {
        Ok(client) => {
            info!("connected to cluster {} at {}", cfg.cluster_name, o.base_url);
            Some(Arc::new(client))
        }
        Err(e) => {
            error!("failed to connect to cluster {}: {}", cfg.cluster_name, e);
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
