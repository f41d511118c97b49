use axum::routing::get;
use axum::Router;

use crate::handlers::resources;
use crate::state::AppState;

/// Routes mounted at `/resources`.
///
/// ```text
/// GET    /                                         -> list_resources
/// POST   /                                         -> create_resource
/// GET    /{id}                                     -> get_resource
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(resources::list_resources).post(resources::create_resource),
        )
        .route("/{id}", get(resources::get_resource))
}
