//! Request middleware: request ID spans and the health endpoint access guard.
//!
//! The request ID layer generates a UUID v4 for each incoming request and
//! creates a tracing span that wraps the entire request lifecycle, so every
//! log line emitted while serving a probe carries the same `request_id`.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    http::header::USER_AGENT,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::access::RequestOrigin;
use crate::error::AppError;

/// Middleware that generates a request ID and creates a request span.
///
/// This should be the outermost middleware layer so the span wraps
/// all request processing, including other middleware and handlers.
pub async fn request_id_layer(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let path = uri.path();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
        duration_ms = tracing::field::Empty,
    );

    let start = Instant::now();

    async move {
        let response = next.run(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::Span::current().record("duration_ms", duration_ms);
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms,
            "Request completed"
        );

        response
    }
    .instrument(span)
    .await
}

/// Build the guard's view of an HTTP request.
///
/// The client address is only known when the server was started with connect
/// info; a user agent that is not valid UTF-8 is treated as present but
/// unrecognized.
pub fn request_origin(request: &Request) -> RequestOrigin {
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .map(|value| value.to_str().unwrap_or_default().to_string());
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    RequestOrigin::http(user_agent, remote_addr)
}

/// Rejects requests that fail the access guard before any check runs.
pub async fn access_guard_layer(request: Request, next: Next) -> Result<Response, AppError> {
    let origin = request_origin(&request);

    if !origin.is_allowed() {
        tracing::warn!(
            user_agent = ?origin.user_agent,
            remote_addr = ?origin.remote_addr,
            "Health probe rejected by access guard"
        );
        return Err(AppError::AccessDenied);
    }

    Ok(next.run(request).await)
}
