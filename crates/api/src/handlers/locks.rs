//! Handlers for lease acquisition, renewal, and release.
//!
//! Thin adapters over [`LockCoordinator`](holdfast_core::coordinator::LockCoordinator):
//! every rule about ownership and expiry lives in the core crate.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use holdfast_core::lock::{Lock, DEFAULT_TTL_SECS};
use holdfast_core::types::ResourceId;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;

fn default_ttl() -> i64 {
    DEFAULT_TTL_SECS
}

/// Body of `POST /locks/acquire`.
#[derive(Debug, Deserialize)]
pub struct AcquireLockRequest {
    pub resource_id: ResourceId,
    pub owner_id: String,
    #[serde(default = "default_ttl")]
    pub ttl_seconds: i64,
}

/// Body of `POST /locks/release` and `POST /locks/heartbeat`.
#[derive(Debug, Deserialize)]
pub struct LockOwnerRequest {
    pub resource_id: ResourceId,
    pub owner_id: String,
}

// ---------------------------------------------------------------------------
// POST /locks/acquire
// ---------------------------------------------------------------------------

/// Acquire a lease, or refresh it if the caller already holds it.
pub async fn acquire_lock(
    State(state): State<AppState>,
    AppJson(input): AppJson<AcquireLockRequest>,
) -> AppResult<Json<Lock>> {
    let lock = state
        .coordinator
        .acquire(input.resource_id, &input.owner_id, input.ttl_seconds)
        .await?;
    Ok(Json(lock))
}

// ---------------------------------------------------------------------------
// POST /locks/release
// ---------------------------------------------------------------------------

pub async fn release_lock(
    State(state): State<AppState>,
    AppJson(input): AppJson<LockOwnerRequest>,
) -> AppResult<Json<Lock>> {
    let lock = state
        .coordinator
        .release(input.resource_id, &input.owner_id)
        .await?;
    Ok(Json(lock))
}

// ---------------------------------------------------------------------------
// POST /locks/heartbeat
// ---------------------------------------------------------------------------

pub async fn heartbeat_lock(
    State(state): State<AppState>,
    AppJson(input): AppJson<LockOwnerRequest>,
) -> AppResult<Json<Lock>> {
    let lock = state
        .coordinator
        .heartbeat(input.resource_id, &input.owner_id)
        .await?;
    Ok(Json(lock))
}

// ---------------------------------------------------------------------------
// GET /locks/{resource_id}
// ---------------------------------------------------------------------------

/// Latest lock record for a resource.
pub async fn get_lock(
    State(state): State<AppState>,
    AppPath(resource_id): AppPath<ResourceId>,
) -> AppResult<Json<Lock>> {
    let lock = state.coordinator.get(resource_id).await?;
    Ok(Json(lock))
}

// ---------------------------------------------------------------------------
// GET /locks
// ---------------------------------------------------------------------------

pub async fn list_locks(State(state): State<AppState>) -> Json<Vec<Lock>> {
    Json(state.coordinator.list().await)
}
