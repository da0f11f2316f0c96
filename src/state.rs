//! Shared application state for request handlers.

use std::sync::Arc;

use crate::checks::HealthChecker;
use crate::config::ProbeConfig;

/// Shared application state, cheap to clone across handlers.
#[derive(Clone)]
pub struct AppState {
    pub checker: HealthChecker,
}

impl AppState {
    /// Creates state with the production checker for `config`.
    pub fn new(config: Arc<ProbeConfig>) -> Self {
        Self::with_checker(HealthChecker::new(config))
    }

    /// Creates state around an already configured checker.
    pub fn with_checker(checker: HealthChecker) -> Self {
        Self { checker }
    }
}
