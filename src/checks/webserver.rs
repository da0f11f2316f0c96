//! Web server liveness check.
//!
//! Two stages: the web server must have at least one running process, and it
//! must answer a GET on the loopback interface within the configured timeout.
//! No processes means no HTTP request is attempted.

use std::sync::Arc;
use std::time::Instant;

use crate::config::WebServerConfig;
use crate::report::CheckResult;

use super::process::ProcessEnumerator;

pub const CHECK_NAME: &str = "apache";

pub async fn check_webserver(
    processes: Arc<dyn ProcessEnumerator>,
    config: &WebServerConfig,
) -> CheckResult {
    let process_count = count_processes(processes, &config.process_name).await;

    if process_count == 0 {
        tracing::warn!(process_name = %config.process_name, "No web server processes running");
        return CheckResult::unhealthy(CHECK_NAME, "No Apache processes found")
            .with_process_count(0);
    }

    let start = Instant::now();
    let outcome = fetch(config).await;
    let elapsed = start.elapsed();

    match outcome {
        Ok(status) => {
            tracing::debug!(url = %config.url, status, process_count, "Web server responding");
            CheckResult::healthy(CHECK_NAME, "Apache responding normally")
                .with_process_count(process_count)
                .with_response_time(elapsed)
        }
        Err(e) => {
            tracing::warn!(url = %config.url, error = %e, process_count, "Web server not responding");
            CheckResult::unhealthy(CHECK_NAME, "Apache not responding to HTTP requests")
                .with_process_count(process_count)
                .with_response_time(elapsed)
        }
    }
}

/// Walks the process table on the blocking pool so the runtime keeps serving.
async fn count_processes(processes: Arc<dyn ProcessEnumerator>, pattern: &str) -> usize {
    let pattern = pattern.to_string();
    match tokio::task::spawn_blocking(move || processes.count_matching(&pattern)).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(error = %e, "Process enumeration aborted");
            0
        }
    }
}

/// GET the probe URL; error statuses count as failures.
async fn fetch(config: &WebServerConfig) -> Result<u16, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.as_str())
        .no_proxy()
        .build()?;

    let response = client.get(&config.url).send().await?.error_for_status()?;
    Ok(response.status().as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};
    use std::time::Duration;

    use axum::http::{header::USER_AGENT, HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::Router;

    use crate::checks::testing::FixedProcesses;
    use crate::report::CheckStatus;

    async fn spawn_server(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    fn config_for(addr: SocketAddr) -> WebServerConfig {
        WebServerConfig {
            url: format!("http://{}/", addr),
            ..WebServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_no_processes_short_circuits() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/",
            get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { "ok" }
            }),
        );
        let addr = spawn_server(app).await;

        let result = check_webserver(Arc::new(FixedProcesses(0)), &config_for(addr)).await;

        assert_eq!(result.status, CheckStatus::Unhealthy);
        assert_eq!(result.message, "No Apache processes found");
        assert_eq!(result.process_count, Some(0));
        assert!(result.response_time_ms.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_running_and_responding_is_healthy() {
        let seen_agent = Arc::new(Mutex::new(None));
        let recorder = Arc::clone(&seen_agent);
        let app = Router::new().route(
            "/",
            get(move |headers: HeaderMap| {
                let agent = headers
                    .get(USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                *recorder.lock().unwrap() = agent;
                async { "Matomo" }
            }),
        );
        let addr = spawn_server(app).await;

        let result = check_webserver(Arc::new(FixedProcesses(4)), &config_for(addr)).await;

        assert_eq!(result.status, CheckStatus::Healthy);
        assert_eq!(result.message, "Apache responding normally");
        assert_eq!(result.process_count, Some(4));
        assert!(result.response_time_ms.is_some());
        assert_eq!(
            seen_agent.lock().unwrap().as_deref(),
            Some("healthcheck-internal")
        );
    }

    #[tokio::test]
    async fn test_error_status_is_unhealthy() {
        let app = Router::new().route(
            "/",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let addr = spawn_server(app).await;

        let result = check_webserver(Arc::new(FixedProcesses(2)), &config_for(addr)).await;

        assert_eq!(result.status, CheckStatus::Unhealthy);
        assert_eq!(result.message, "Apache not responding to HTTP requests");
        assert_eq!(result.process_count, Some(2));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unhealthy() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = check_webserver(Arc::new(FixedProcesses(1)), &config_for(addr)).await;
        assert_eq!(result.status, CheckStatus::Unhealthy);
        assert!(result.response_time_ms.is_some());
    }

    #[tokio::test]
    async fn test_slow_server_hits_timeout() {
        let app = Router::new().route(
            "/",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let addr = spawn_server(app).await;
        let config = WebServerConfig {
            timeout_seconds: 1,
            ..config_for(addr)
        };

        let start = Instant::now();
        let result = check_webserver(Arc::new(FixedProcesses(1)), &config).await;

        assert_eq!(result.status, CheckStatus::Unhealthy);
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    /// Returns one process once released, or zero if never released.
    struct GatedProcesses(Mutex<mpsc::Receiver<()>>);

    impl ProcessEnumerator for GatedProcesses {
        fn count_matching(&self, _pattern: &str) -> usize {
            match self.0.lock().unwrap().recv_timeout(Duration::from_secs(5)) {
                Ok(()) => 1,
                Err(_) => 0,
            }
        }
    }

    // Single-threaded runtime: the release task can only run if the process
    // walk is off the runtime thread.
    #[tokio::test(flavor = "current_thread")]
    async fn test_process_walk_does_not_block_runtime() {
        let addr = spawn_server(Router::new().route("/", get(|| async { "Matomo" }))).await;
        let (release, gate) = mpsc::channel();
        tokio::spawn(async move {
            let _ = release.send(());
        });

        let result = check_webserver(
            Arc::new(GatedProcesses(Mutex::new(gate))),
            &config_for(addr),
        )
        .await;

        assert_eq!(result.process_count, Some(1));
        assert_eq!(result.status, CheckStatus::Healthy);
    }
}
