//! Database connectivity check.
//!
//! Connects with the configured credentials, runs `SELECT 1`, and closes the
//! connection before returning whatever the outcome. Connect and query share a
//! single timeout so a stalled server cannot hang the probe.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{ConnectOptions, Connection};

use crate::config::DatabaseConfig;
use crate::report::CheckResult;

pub const CHECK_NAME: &str = "database";

/// Failure modes of a database round trip
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Connection timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Opens a connection, runs a trivial query, and releases the connection.
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn ping(&self, config: &DatabaseConfig) -> Result<(), DatabaseError>;
}

/// MySQL/MariaDB probe backed by a single `sqlx` connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlProbe;

#[async_trait]
impl DatabaseProbe for MySqlProbe {
    async fn ping(&self, config: &DatabaseConfig) -> Result<(), DatabaseError> {
        let (host, port) = config.endpoint();
        let options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.name);

        let timeout = config.timeout();
        let round_trip = async {
            let mut conn = options
                .connect()
                .await
                .map_err(|e| DatabaseError::Connect(e.to_string()))?;

            let result = sqlx::query("SELECT 1")
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()));

            // Close regardless of the query outcome; a failed close changes nothing
            let _ = conn.close().await;
            result
        };

        tokio::time::timeout(timeout, round_trip)
            .await
            .map_err(|_| DatabaseError::Timeout(timeout))?
    }
}

pub async fn check_database(probe: &dyn DatabaseProbe, config: &DatabaseConfig) -> CheckResult {
    let start = Instant::now();
    let outcome = probe.ping(config).await;
    let elapsed = start.elapsed();

    match outcome {
        Ok(()) => {
            tracing::debug!(host = %config.host, elapsed_ms = elapsed.as_millis() as u64, "Database reachable");
            CheckResult::healthy(CHECK_NAME, "Connected successfully").with_response_time(elapsed)
        }
        Err(e) => {
            tracing::warn!(host = %config.host, error = %e, "Database check failed");
            CheckResult::unhealthy(CHECK_NAME, e.to_string()).with_response_time(elapsed)
        }
    }
}
