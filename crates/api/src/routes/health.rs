use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

/// GET /health -- the coordinator is in-process, so reaching it means healthy.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET / -- service banner.
async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Holdfast lock coordinator",
    })
}

/// Health route, mounted under `/api`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Banner route, mounted at the server root.
pub fn root_router() -> Router<AppState> {
    Router::new().route("/", get(root))
}
