//! Result records produced by a probe.
//!
//! A `HealthReport` is built fresh for every invocation and discarded once it
//! has been written out, either as pretty JSON on stdout (`check` command) or
//! as an HTTP response body (`serve` mode).

use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::{Local, SecondsFormat};
use serde::Serialize;

/// Service name reported by the ping endpoint
pub const SERVICE_NAME: &str = "matomo";

/// Outcome of a single check, and of the report as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Unhealthy,
}

impl CheckStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, CheckStatus::Healthy)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Healthy => write!(f, "healthy"),
            CheckStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Structured outcome of one sub-check.
///
/// The optional diagnostics are only serialized by the checks that produce
/// them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_directories: Option<usize>,
}

impl CheckResult {
    pub fn healthy(name: &'static str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Healthy, message)
    }

    pub fn unhealthy(name: &'static str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Unhealthy, message)
    }

    fn new(name: &'static str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name,
            status,
            message: message.into(),
            process_count: None,
            response_time_ms: None,
            issues: None,
            checked_directories: None,
        }
    }

    pub fn with_response_time(mut self, elapsed: Duration) -> Self {
        self.response_time_ms = Some(round_millis(elapsed));
        self
    }

    pub fn with_process_count(mut self, count: usize) -> Self {
        self.process_count = Some(count);
        self
    }

    pub fn with_issues(mut self, issues: Vec<String>) -> Self {
        self.issues = Some(issues);
        self
    }

    pub fn with_checked_directories(mut self, count: usize) -> Self {
        self.checked_directories = Some(count);
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}

/// Aggregate of every check run by one probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: CheckStatus,
    pub timestamp: String,
    pub checks: Vec<CheckResult>,
}

impl HealthReport {
    /// Reduce the check list to one overall status: healthy iff every check is.
    pub fn from_checks(checks: Vec<CheckResult>) -> Self {
        let status = if checks.iter().all(CheckResult::is_healthy) {
            CheckStatus::Healthy
        } else {
            CheckStatus::Unhealthy
        };

        Self {
            status,
            timestamp: timestamp_now(),
            checks,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    /// Process exit code for direct invocation (container `HEALTHCHECK`).
    pub fn exit_code(&self) -> u8 {
        if self.is_healthy() {
            0
        } else {
            1
        }
    }

    /// HTTP status for the health endpoint.
    pub fn http_status(&self) -> StatusCode {
        if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }

    /// Pretty-printed JSON followed by a newline, as written to stdout.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    pub fn unhealthy_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|check| !check.is_healthy())
    }
}

/// Fixed payload returned by the ping endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
}

impl PingResponse {
    pub fn now() -> Self {
        Self {
            status: "ok",
            timestamp: timestamp_now(),
            service: SERVICE_NAME,
        }
    }
}

/// ISO-8601 local time with numeric offset, second precision.
pub fn timestamp_now() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Milliseconds rounded to two decimal places.
fn round_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}
