use axum::routing::post;
use axum::Router;

use crate::handlers::insight;
use crate::state::AppState;

/// Routes mounted at `/ml`.
pub fn router() -> Router<AppState> {
    Router::new().route("/suggest", post(insight::suggest_ttl))
}
