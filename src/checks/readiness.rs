//! Readiness marker check.

use std::path::Path;

use crate::report::CheckResult;

pub const CHECK_NAME: &str = "readiness";

/// Healthy iff the sentinel file written by the container entrypoint exists.
pub fn check_readiness(marker: &Path) -> CheckResult {
    if marker.exists() {
        CheckResult::healthy(CHECK_NAME, "Container initialization complete")
    } else {
        tracing::warn!(marker = %marker.display(), "Readiness marker not present");
        CheckResult::unhealthy(CHECK_NAME, "Container initialization not complete")
    }
}
