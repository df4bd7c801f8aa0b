//! # Routes
//!
//! Axum router configuration for the redirect relay.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET  /health - Health check
/// - GET  /redirect/return - Return URL of redirect flows
/// - POST /redirect/message - Cross-window message (`{sourceId, urlParams}`)
/// - POST /redirect/{source_id}/close - Overlay close button
/// - POST /redirect/{source_id}/back-to-cart - Overlay "back to cart" link
pub fn create_router(state: AppState) -> Router {
    // the redirect target is a third-party origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let redirect_routes = Router::new()
        .route("/return", get(handlers::redirect_return))
        .route("/message", post(handlers::redirect_message))
        .route("/{source_id}/close", post(handlers::redirect_close))
        .route("/{source_id}/back-to-cart", post(handlers::redirect_back_to_cart));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/redirect", redirect_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
