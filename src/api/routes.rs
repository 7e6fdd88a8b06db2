//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    admission_handler, clear_handler, health_handler, lookup_handler, put_handler, stats_handler,
    AppState,
};

/// Creates the admin router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache` - Store a value
/// - `GET /cache/:key` - Read a value
/// - `DELETE /cache/:prefix` - Clear every key with a prefix
/// - `GET /stats` - Store, admission and lock statistics
/// - `GET /admission` - Admission policy segments
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", put(put_handler))
        .route("/cache/:key", get(lookup_handler).delete(clear_handler))
        .route("/stats", get(stats_handler))
        .route("/admission", get(admission_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
