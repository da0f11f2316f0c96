//! HTTP server startup logic.

use std::net::SocketAddr;

use axum::Router;

use crate::config::HttpServerConfig;

use super::shutdown;

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid listen address: {0}")]
    Address(String),
}

/// Resolve the configured host and port into a socket address.
pub fn listen_addr(config: &HttpServerConfig) -> Result<SocketAddr, ServerError> {
    format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Address(format!("{}:{}: {}", config.host, config.port, e)))
}

/// Start the HTTP server.
///
/// Client addresses are exposed to handlers as connect info for the access
/// guard. This function blocks until the server shuts down.
pub async fn start_server(app: Router, config: &HttpServerConfig) -> Result<(), ServerError> {
    let addr = listen_addr(config)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Starting HTTP server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown::shutdown_signal())
    .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_addr_from_config() {
        let addr = listen_addr(&HttpServerConfig::default()).unwrap();
        assert_eq!(addr.port(), 8080);
        assert!(addr.ip().is_unspecified());
    }

    #[test]
    fn test_listen_addr_rejects_hostname() {
        let config = HttpServerConfig {
            host: "not an address".to_string(),
            port: 80,
        };
        assert!(matches!(listen_addr(&config), Err(ServerError::Address(_))));
    }
}
