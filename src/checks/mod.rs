//! Health checks and the aggregator that runs them.
//!
//! Four independent point-in-time checks, always run one after another in a
//! fixed order:
//! 1. `readiness` - the container entrypoint has written its marker file
//! 2. `database` - the database accepts a connection and answers `SELECT 1`
//! 3. `apache` - the web server has running processes and answers on loopback
//! 4. `filesystem` - critical directories exist and accept new files
//!
//! Every failure is turned into an unhealthy `CheckResult`; nothing in here
//! returns an error to the caller.

pub mod database;
pub mod filesystem;
pub mod process;
pub mod readiness;
pub mod webserver;

use std::sync::Arc;

use tracing::instrument;

use crate::config::ProbeConfig;
use crate::report::{CheckResult, HealthReport};

pub use database::{DatabaseError, DatabaseProbe, MySqlProbe};
pub use process::{ProcessEnumerator, SystemProcesses};

/// Runs the health checks against an explicit configuration.
///
/// Holds no mutable state, so one checker can serve any number of probes.
#[derive(Clone)]
pub struct HealthChecker {
    config: Arc<ProbeConfig>,
    processes: Arc<dyn ProcessEnumerator>,
    database: Arc<dyn DatabaseProbe>,
}

impl HealthChecker {
    /// Create a checker using the platform process table and a MySQL probe.
    pub fn new(config: Arc<ProbeConfig>) -> Self {
        Self {
            config,
            processes: Arc::new(SystemProcesses),
            database: Arc::new(MySqlProbe),
        }
    }

    /// Replace the process enumerator.
    pub fn with_process_enumerator(mut self, processes: Arc<dyn ProcessEnumerator>) -> Self {
        self.processes = processes;
        self
    }

    /// Replace the database probe.
    pub fn with_database_probe(mut self, database: Arc<dyn DatabaseProbe>) -> Self {
        self.database = database;
        self
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run every check in order and reduce them to one report.
    #[instrument(name = "checks::run", skip(self))]
    pub async fn run(&self) -> HealthReport {
        let config = &self.config;

        let checks = vec![
            readiness::check_readiness(&config.readiness.marker_path),
            database::check_database(self.database.as_ref(), &config.database).await,
            webserver::check_webserver(Arc::clone(&self.processes), &config.webserver).await,
            self.check_filesystem().await,
        ];

        let report = HealthReport::from_checks(checks);

        if report.is_healthy() {
            tracing::debug!("All health checks passed");
        } else {
            let failed: Vec<&str> = report.unhealthy_checks().map(|c| c.name).collect();
            tracing::warn!(failed = ?failed, "Health checks failed");
        }

        report
    }

    /// Directory probing touches the disk, so it runs on the blocking pool.
    async fn check_filesystem(&self) -> CheckResult {
        let dirs = self.config.filesystem.critical_dirs.clone();
        match tokio::task::spawn_blocking(move || filesystem::check_filesystem(&dirs)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Filesystem check aborted");
                CheckResult::unhealthy(filesystem::CHECK_NAME, "File system issues detected")
                    .with_issues(vec![format!("Check aborted: {}", e)])
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fakes shared by unit tests.

    use async_trait::async_trait;

    use super::{DatabaseError, DatabaseProbe, ProcessEnumerator};
    use crate::config::DatabaseConfig;

    pub struct FixedProcesses(pub usize);

    impl ProcessEnumerator for FixedProcesses {
        fn count_matching(&self, _pattern: &str) -> usize {
            self.0
        }
    }

    pub struct ReachableDatabase;

    #[async_trait]
    impl DatabaseProbe for ReachableDatabase {
        async fn ping(&self, _config: &DatabaseConfig) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    pub struct DownDatabase;

    #[async_trait]
    impl DatabaseProbe for DownDatabase {
        async fn ping(&self, _config: &DatabaseConfig) -> Result<(), DatabaseError> {
            Err(DatabaseError::Connect("Connection refused".to_string()))
        }
    }
}
