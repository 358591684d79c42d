//! API route definitions.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::ws::ws_handler;

use super::handlers;
use super::state::AppState;

/// Slack for multipart framing on top of the configured upload cap.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Dashboards are unauthenticated by design; keep the surface open.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit =
        DefaultBodyLimit::max(state.settings.max_upload_size as usize + MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/packages",
            get(handlers::list_packages).post(handlers::upload_package),
        )
        .route("/packages/{filename}", get(handlers::download_package))
        .route("/agents", get(handlers::list_agents))
        .route("/ws", get(ws_handler))
        .layer(body_limit)
        .layer(cors)
        .layer(trace_layer)
        .with_state(state)
}
