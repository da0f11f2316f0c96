//! HTTP route handlers for the probe endpoints.
//!
//! `/ping` answers without touching the stack. `/health` runs every check and
//! sits behind the access guard. The `.php` aliases keep existing orchestrator
//! and load balancer probe paths working unchanged.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod health;
pub mod ping;

use axum::{middleware, routing::get, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::CACHE_CONTROL_PROBE;
use crate::middleware::{access_guard_layer, request_id_layer};
use crate::state::AppState;

/// Creates the Axum router with both probe endpoints.
pub fn create_router(state: AppState) -> Router {
    let ping_routes = Router::new()
        .route("/ping", get(ping::ping))
        .route("/ping.php", get(ping::ping));

    // Guard runs only on matched health routes
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/healthcheck.php", get(health::health))
        .route_layer(middleware::from_fn(access_guard_layer));

    Router::new()
        .merge(ping_routes)
        .merge(health_routes)
        .with_state(state)
        // Probes are point-in-time; never let a proxy cache them
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_PROBE),
        ))
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
