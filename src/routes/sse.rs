use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use crate::AppState;
use crate::clients::aggregator::Aggregator;

/// SSE endpoint that pushes a fresh cluster overview every poll interval.
/// The first event is sent immediately.
pub async fn handle_cluster_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let period = Duration::from_secs(state.config.stream_interval_secs.max(1));
    let agg = state.aggregator.clone();

    let poll_stream = stream::unfold((agg, true), move |(agg, is_first)| async move {
        if !is_first {
            tokio::time::sleep(period).await;
        }
        let event = overview_event(&agg).await;
        Some((Ok::<_, Infallible>(event), (agg, false)))
    });

    Sse::new(poll_stream).keep_alive(KeepAlive::default().interval(Duration::from_secs(15)))
}

async fn overview_event(agg: &Arc<Aggregator>) -> Event {
    match agg.cluster_overview().await {
        Ok(overview) => match serde_json::to_string(&overview) {
            Ok(data) => Event::default().event("cluster").data(data),
            Err(e) => Event::default().event("error").data(e.to_string()),
        },
        Err(e) => Event::default().event("error").data(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use futures_util::StreamExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::AppState;
    use crate::clients::ClusterSource;
    use crate::clients::aggregator::Aggregator;
    use crate::clients::aggregator::tests::FakeCluster;
    use crate::config::Config;
    use crate::routes::build_router;

    async fn first_event(source: Option<Arc<dyn ClusterSource>>) -> String {
        let config = Config::parse("{}").unwrap();
        let aggregator = Aggregator::new(source, config.cluster_name.clone(), "default".into());
        let router = build_router(AppState {
            aggregator: Arc::new(aggregator),
            config: Arc::new(config),
        });

        let resp = router
            .oneshot(
                Request::get("/api/cluster/stream")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let mut body = resp.into_body().into_data_stream();
        let chunk = body.next().await.unwrap().unwrap();
        String::from_utf8(chunk.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_first_event_is_overview() {
        let event = first_event(Some(Arc::new(FakeCluster::sample()))).await;
        assert!(event.starts_with("event: cluster\n"));
        assert!(event.contains("\"cluster_name\":\"kind-pulsecheck\""));
    }

    #[tokio::test]
    async fn test_error_event_without_client() {
        let event = first_event(None).await;
        assert!(event.starts_with("event: error\n"));
        assert!(event.contains("data: Kubernetes client not initialized"));
    }
}
