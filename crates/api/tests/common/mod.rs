#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jamlist_core::protocol::ServerMessage;
use jamlist_db::{InMemoryAdapter, NoopAdapter, SharedAdapter};
use jamlist_events::BroadcastBus;
use jamlist_sync::SyncCoordinator;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use jamlist_api::config::{PersistenceConfig, ServerConfig};
use jamlist_api::router::build_app_router;
use jamlist_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        persistence: PersistenceConfig::disabled(),
    }
}

/// A running application plus handles tests use to poke at it.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub bus: Arc<BroadcastBus<ServerMessage>>,
    pub cancel: CancellationToken,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router over `adapter`.
///
/// Goes through the same `build_app_router` as `main.rs`, so tests exercise
/// the production middleware stack.
pub fn build_app_with(adapter: SharedAdapter, persistence_timeout: Duration) -> TestApp {
    let config = test_config();
    let bus = Arc::new(BroadcastBus::new());
    let cancel = CancellationToken::new();
    let (coordinator, _worker) = SyncCoordinator::start(
        adapter,
        Arc::clone(&bus),
        persistence_timeout,
        cancel.clone(),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        coordinator: Arc::new(coordinator),
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        bus,
        cancel,
    }
}

/// App backed by an in-memory durable store the test can inspect.
pub fn build_test_app(store: Arc<InMemoryAdapter>) -> TestApp {
    build_app_with(store, Duration::from_secs(1))
}

/// App with no durable store at all.
pub fn build_memory_only_app() -> TestApp {
    build_app_with(Arc::new(NoopAdapter), Duration::from_secs(1))
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: String) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
