use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router: JSON endpoints under `/v1`, DAV everywhere else.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .fallback(handler::dav_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
