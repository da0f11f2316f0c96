//! matomo-healthcheck entry point.
//!
//! Parses arguments, resolves configuration once, initializes tracing, then
//! either runs the checks a single time (`check`, the default) or serves the
//! probe endpoints over HTTP (`serve`).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matomo_healthcheck::checks::HealthChecker;
use matomo_healthcheck::cli;
use matomo_healthcheck::config::{LoggingConfig, ProbeConfig, DEFAULT_LOG_FILTER};
use matomo_healthcheck::http::start_server;
use matomo_healthcheck::routes::create_router;
use matomo_healthcheck::state::AppState;
use matomo_healthcheck::AppError;

/// Health probe for a Matomo container stack
#[derive(Parser, Debug)]
#[command(name = "matomo-healthcheck", version, about)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "matomo_healthcheck=debug")
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Run all checks once, print the report, exit 0 if healthy and 1 otherwise
    Check,
    /// Serve /ping and /health over HTTP
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let config = match ProbeConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&log_filter, &LoggingConfig::default());
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&log_filter, &config.logging);
    tracing::debug!(config = ?config, "Loaded configuration");

    let result = match args.command.unwrap_or(Command::Check) {
        Command::Check => run_check(config).await,
        Command::Serve => run_server(config).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Probe failed");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout carries only the JSON report.
fn init_tracing(filter: &str, logging: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(filter));

    if logging.is_json() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Direct invocation skips the access guard; a local process is always allowed.
async fn run_check(config: ProbeConfig) -> Result<ExitCode, AppError> {
    let checker = HealthChecker::new(Arc::new(config));
    let code = cli::run_once(&checker, &mut std::io::stdout().lock()).await?;
    Ok(ExitCode::from(code))
}

async fn run_server(config: ProbeConfig) -> Result<ExitCode, AppError> {
    let config = Arc::new(config);

    tracing::info!(
        database = %config.database.host,
        webserver = %config.webserver.url,
        directories = config.filesystem.critical_dirs.len(),
        "Probe configured"
    );

    let app = create_router(AppState::new(Arc::clone(&config)));
    start_server(app, &config.http).await?;

    Ok(ExitCode::SUCCESS)
}
