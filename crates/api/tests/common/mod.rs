#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use holdfast_api::config::ServerConfig;
use holdfast_api::router::build_app_router;
use holdfast_api::state::AppState;
use holdfast_core::clock::ManualClock;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as the single CORS origin.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        ..ServerConfig::default()
    }
}

/// A full router plus handles on its state and clock.
///
/// The router is cheap to clone; each `oneshot` consumes one clone while
/// the state persists across requests.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: ManualClock,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router with all middleware layers over a
/// manually driven clock.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let clock = ManualClock::default();
    let state = AppState::new(config.clone(), Arc::new(clock.clone()));
    let router = build_app_router(state.clone(), &config);
    TestApp {
        router,
        state,
        clock,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_raw(app: Router, uri: &str, body: &'static str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a resource through the API and return its id.
pub async fn create_resource(app: &TestApp, resource_type: &str, identifier: &str) -> String {
    let response = post_json(
        app.app(),
        "/api/resources",
        serde_json::json!({"type": resource_type, "identifier": identifier}),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    body_json(response).await["id"]
        .as_str()
        .unwrap()
        .to_string()
}

pub async fn acquire(
    app: &TestApp,
    resource_id: &str,
    owner_id: &str,
    ttl_seconds: i64,
) -> Response<Body> {
    post_json(
        app.app(),
        "/api/locks/acquire",
        serde_json::json!({
            "resource_id": resource_id,
            "owner_id": owner_id,
            "ttl_seconds": ttl_seconds,
        }),
    )
    .await
}

pub async fn heartbeat(app: &TestApp, resource_id: &str, owner_id: &str) -> Response<Body> {
    post_json(
        app.app(),
        "/api/locks/heartbeat",
        serde_json::json!({"resource_id": resource_id, "owner_id": owner_id}),
    )
    .await
}

pub async fn release(app: &TestApp, resource_id: &str, owner_id: &str) -> Response<Body> {
    post_json(
        app.app(),
        "/api/locks/release",
        serde_json::json!({"resource_id": resource_id, "owner_id": owner_id}),
    )
    .await
}
