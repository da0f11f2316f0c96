//! Health check endpoint for container orchestration.
//!
//! Runs the full check suite and maps the overall status onto the HTTP status
//! code: 200 when healthy, 503 otherwise, so load balancers and orchestrators
//! that only look at the status line still get the right answer.

use axum::{extract::State, http::StatusCode, Json};
use tracing::instrument;

use crate::report::HealthReport;
use crate::state::AppState;

#[instrument(name = "health::health", skip(state))]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.checker.run().await;
    (report.http_status(), Json(report))
}
