pub mod health;
pub mod insight;
pub mod locks;
pub mod resources;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                                          service health
///
/// /locks                                           list all lock records
/// /locks/acquire                                   acquire or refresh (POST)
/// /locks/release                                   release (POST)
/// /locks/heartbeat                                 renew (POST)
/// /locks/{resource_id}                             latest record for a resource
///
/// /resources                                       list, register
/// /resources/{id}                                  get
///
/// /ml/suggest                                      TTL suggestion (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/locks", locks::router())
        .nest("/resources", resources::router())
        .nest("/ml", insight::router())
}
