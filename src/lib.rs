//! matomo-healthcheck: container health probe for a Matomo web stack.
//!
//! Reports whether the application server, database, filesystem and startup
//! marker of the container are operational. The same checks back two
//! surfaces: a direct process invocation for container `HEALTHCHECK`
//! directives, and an HTTP server for orchestrator probes.

pub mod access;
pub mod checks;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod report;
pub mod routes;
pub mod state;

pub use error::AppError;
