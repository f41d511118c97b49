use axum::routing::{get, post};
use axum::Router;

use crate::handlers::locks;
use crate::state::AppState;

/// Routes mounted at `/locks`.
///
/// ```text
/// GET    /                                         -> list_locks
/// POST   /acquire                                  -> acquire_lock
/// POST   /release                                  -> release_lock
/// POST   /heartbeat                                -> heartbeat_lock
/// GET    /{resource_id}                            -> get_lock
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(locks::list_locks))
        .route("/acquire", post(locks::acquire_lock))
        .route("/release", post(locks::release_lock))
        .route("/heartbeat", post(locks::heartbeat_lock))
        .route("/{resource_id}", get(locks::get_lock))
}
