//! HTTP server wiring one consensus node to its endpoint set

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use quorum_consensus::{ConsensusNode, Health, StartOutcome};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// HTTP server for one node
pub struct NodeHttpServer {
    node: Arc<ConsensusNode>,
}

impl NodeHttpServer {
    /// Create a server for the given node
    pub fn new(node: Arc<ConsensusNode>) -> Self {
        Self { node }
    }

    /// Create the Axum router
    pub fn router(self) -> Router {
        // CORS layer to allow browser clients
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

        Router::new()
            .route("/status", get(handle_status))
            .route("/message", post(handle_message))
            .route("/start", get(handle_start))
            .route("/stop", get(handle_stop))
            .route("/getState", get(handle_get_state))
            .layer(cors)
            .with_state(self.node)
    }

    /// Bind and serve. `on_ready` is invoked exactly once with the node's
    /// identifier, after the listening socket is bound.
    pub async fn run<F>(self, addr: &str, on_ready: F) -> anyhow::Result<()>
    where
        F: FnOnce(u32) + Send,
    {
        let node_id = self.node.node_id();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Node {} is listening on {}", node_id, addr);
        on_ready(node_id);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn handle_status(State(node): State<Arc<ConsensusNode>>) -> impl IntoResponse {
    match node.health() {
        Health::Live => (StatusCode::OK, "live"),
        Health::Faulty => (StatusCode::INTERNAL_SERVER_ERROR, "faulty"),
    }
}

async fn handle_message(
    State(node): State<Arc<ConsensusNode>>,
    Json(payload): Json<serde_json::Value>,
) -> StatusCode {
    node.receive_message(&payload);
    StatusCode::OK
}

async fn handle_start(State(node): State<Arc<ConsensusNode>>) -> impl IntoResponse {
    match node.start() {
        Ok(StartOutcome::Started) => (StatusCode::OK, "Consensus algorithm started".to_string()),
        Ok(StartOutcome::AlreadyStarted) => (StatusCode::OK, "Consensus already started".to_string()),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn handle_stop(State(node): State<Arc<ConsensusNode>>) -> impl IntoResponse {
    node.stop();
    (StatusCode::OK, "Consensus algorithm stopped")
}

async fn handle_get_state(State(node): State<Arc<ConsensusNode>>) -> impl IntoResponse {
    Json(node.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use quorum_consensus::{NodeConfig, Value, ValueRegistry};
    use tower::ServiceExt;

    fn test_node(faulty: bool) -> Arc<ConsensusNode> {
        ConsensusNode::new(
            NodeConfig {
                node_id: 0,
                total_nodes: 4,
                faulty_nodes: 1,
                initial_value: Value::One,
                faulty,
            },
            Arc::new(ValueRegistry::new()),
        )
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn status_reports_live_for_healthy_node() {
        let router = NodeHttpServer::new(test_node(false)).router();
        let response = router.oneshot(get("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "live");
    }

    #[tokio::test]
    async fn status_reports_faulty_with_500() {
        let router = NodeHttpServer::new(test_node(true)).router();
        let response = router.oneshot(get("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "faulty");
    }

    #[tokio::test]
    async fn message_is_accepted_without_state_change() {
        let node = test_node(false);
        let router = NodeHttpServer::new(node.clone()).router();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/message")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"anything":"goes","n":42}"#))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(node.snapshot().k, Some(0));
    }

    #[tokio::test]
    async fn start_then_start_again() {
        let node = test_node(false);

        let response = NodeHttpServer::new(node.clone())
            .router()
            .oneshot(get("/start"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Consensus algorithm started");

        let response = NodeHttpServer::new(node.clone())
            .router()
            .oneshot(get("/start"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Consensus already started");
    }

    #[tokio::test]
    async fn start_rejects_faulty_node() {
        let node = test_node(true);
        let router = NodeHttpServer::new(node.clone()).router();

        let response = router.oneshot(get("/start")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_string(response).await,
            "Cannot start consensus on a faulty node"
        );
        // State untouched by the rejection
        assert!(!node.snapshot().killed);
    }

    #[tokio::test]
    async fn stop_acknowledges_and_kills() {
        let node = test_node(false);
        let router = NodeHttpServer::new(node.clone()).router();

        let response = router.oneshot(get("/stop")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Consensus algorithm stopped");
        assert!(node.snapshot().killed);
    }

    #[tokio::test]
    async fn get_state_returns_snapshot_json() {
        let router = NodeHttpServer::new(test_node(false)).router();
        let response = router.oneshot(get("/getState")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "killed": false, "x": 1, "decided": false, "k": 0 })
        );
    }

    #[tokio::test]
    async fn get_state_for_faulty_node_is_all_null() {
        let router = NodeHttpServer::new(test_node(true)).router();
        let response = router.oneshot(get("/getState")).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "killed": false, "x": null, "decided": null, "k": null })
        );
    }
}
