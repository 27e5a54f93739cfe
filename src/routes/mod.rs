pub mod api;
pub mod sse;

use axum::{Router, http::HeaderValue, routing::get};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::AppState;
use crate::config::Config;

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Health
        .route("/health", get(api::handle_health))
        // Pods
        .route("/api/pods", get(api::handle_list_pods))
        .route("/api/pods/{name}", get(api::handle_get_pod))
        .route("/api/pods/{name}/logs", get(api::handle_get_pod_logs))
        // Metrics
        .route("/api/metrics", get(api::handle_metrics))
        // Nodes
        .route("/api/nodes", get(api::handle_list_nodes))
        // Cluster
        .route("/api/cluster", get(api::handle_cluster_overview))
        .route("/api/cluster/stream", get(sse::handle_cluster_events))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(cfg: &Config) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if cfg.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cfg
        .cors
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
