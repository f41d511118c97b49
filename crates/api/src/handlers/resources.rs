//! Handlers for the resource registry.

use axum::extract::State;
use axum::Json;

use holdfast_core::error::CoreError;
use holdfast_core::resource::{CreateResource, Resource};
use holdfast_core::types::ResourceId;

use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /resources
// ---------------------------------------------------------------------------

/// Register a resource. Duplicate `(type, identifier)` pairs are a 409.
pub async fn create_resource(
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateResource>,
) -> AppResult<Json<Resource>> {
    let resource = state.resources.create(&input).await?;

    tracing::info!(
        resource_id = %resource.id,
        resource_type = %resource.resource_type,
        identifier = %resource.identifier,
        "Resource registered",
    );

    Ok(Json(resource))
}

// ---------------------------------------------------------------------------
// GET /resources
// ---------------------------------------------------------------------------

pub async fn list_resources(State(state): State<AppState>) -> Json<Vec<Resource>> {
    Json(state.resources.list().await)
}

// ---------------------------------------------------------------------------
// GET /resources/{id}
// ---------------------------------------------------------------------------

pub async fn get_resource(
    State(state): State<AppState>,
    AppPath(id): AppPath<ResourceId>,
) -> AppResult<Json<Resource>> {
    state
        .resources
        .get(id)
        .await
        .map(Json)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Resource",
            id,
        }))
}
