//! Handler for TTL suggestions.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use holdfast_core::insight::TtlSuggestion;
use holdfast_core::types::ResourceId;

use crate::error::AppResult;
use crate::extract::AppJson;
use crate::state::AppState;

/// Body of `POST /ml/suggest`.
#[derive(Debug, Deserialize)]
pub struct SuggestTtlRequest {
    pub resource_id: ResourceId,
    pub owner_id: String,
    /// Used as the suggestion when the resource has no recorded history.
    #[serde(default)]
    pub historical_ttl: Option<i64>,
}

/// Suggest a TTL and anomaly score from the resource's recorded usage.
pub async fn suggest_ttl(
    State(state): State<AppState>,
    AppJson(input): AppJson<SuggestTtlRequest>,
) -> AppResult<Json<TtlSuggestion>> {
    let suggestion = state
        .coordinator
        .suggest_ttl(input.resource_id, &input.owner_id, input.historical_ttl)
        .await?;
    Ok(Json(suggestion))
}
