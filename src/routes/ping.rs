//! Ping endpoint: proves the probe service itself is up.

use axum::Json;

use crate::report::PingResponse;

/// Returns a fixed `ok` payload. Runs no checks.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse::now())
}
