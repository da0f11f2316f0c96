//! Direct invocation: one probe, the report on a writer, an exit code back.

use std::io::Write;

use crate::checks::HealthChecker;
use crate::error::AppError;

/// Run every check once and write the pretty JSON report to `out`.
///
/// Returns the process exit code: 0 when healthy, 1 otherwise.
pub async fn run_once<W: Write>(checker: &HealthChecker, out: &mut W) -> Result<u8, AppError> {
    let report = checker.run().await;

    out.write_all(report.to_pretty_json()?.as_bytes())?;
    out.flush()?;

    Ok(report.exit_code())
}
