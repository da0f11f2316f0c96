//! Configuration loading and constants.
//!
//! Configuration is resolved once at process start: built-in defaults, then an
//! optional TOML file, then the `MATOMO_DATABASE_*` environment variables.
//! `ProbeConfig` is the root struct and is passed explicitly to the checker.

use std::path::{Path, PathBuf};
use std::time::Duration;

use const_format::formatcp;
use serde::Deserialize;

// =============================================================================
// HTTP Server Defaults
// =============================================================================

/// Default bind address for `serve` mode
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";

/// Default bind port for `serve` mode
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Probe responses must never be served from a cache
pub const CACHE_CONTROL_PROBE: &str = "no-store, max-age=0";

// =============================================================================
// Database Defaults
// =============================================================================

pub const ENV_DATABASE_HOST: &str = "MATOMO_DATABASE_HOST";
pub const ENV_DATABASE_USERNAME: &str = "MATOMO_DATABASE_USERNAME";
pub const ENV_DATABASE_PASSWORD: &str = "MATOMO_DATABASE_PASSWORD";
pub const ENV_DATABASE_DBNAME: &str = "MATOMO_DATABASE_DBNAME";

pub const DEFAULT_DATABASE_HOST: &str = "mariadb";
pub const DEFAULT_DATABASE_PORT: u16 = 3306;
pub const DEFAULT_DATABASE_USERNAME: &str = "user";
pub const DEFAULT_DATABASE_PASSWORD: &str = "password";
pub const DEFAULT_DATABASE_NAME: &str = "matomo";

/// Upper bound on connect + query time for the database check
pub const DEFAULT_DATABASE_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// Web Server Liveness Defaults
// =============================================================================

/// Substring matched against process names and command lines
pub const DEFAULT_PROCESS_NAME: &str = "apache2";

pub const LOOPBACK_HOST: &str = "localhost";

pub const DEFAULT_WEBSERVER_URL: &str = formatcp!("http://{}/", LOOPBACK_HOST);

pub const DEFAULT_WEBSERVER_TIMEOUT_SECS: u64 = 3;

/// Marker recognized by the access guard in caller user agents
pub const HEALTHCHECK_AGENT_MARKER: &str = "healthcheck";

/// User agent sent by the loopback probe; contains the guard marker so the
/// probe's own request is never rejected.
pub const DEFAULT_PROBE_USER_AGENT: &str = formatcp!("{}-internal", HEALTHCHECK_AGENT_MARKER);

// =============================================================================
// Filesystem and Readiness Defaults
// =============================================================================

pub const DEFAULT_CRITICAL_DIRS: [&str; 3] = [
    "/var/www/html/config",
    "/var/www/html/tmp",
    "/var/www/html/tmp/cache",
];

/// Prefix of the probe files created and removed by the filesystem check
pub const PROBE_FILE_PREFIX: &str = ".healthcheck_test_";

/// Sentinel written by the container entrypoint once initialization finishes
pub const DEFAULT_READINESS_MARKER: &str = "/tmp/container_ready";

// =============================================================================
// Logging
// =============================================================================

/// Default log filter when neither --log-level nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "matomo_healthcheck=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// HTTP server configuration (`serve` mode only)
    pub http: HttpServerConfig,
    pub database: DatabaseConfig,
    pub webserver: WebServerConfig,
    pub filesystem: FilesystemConfig,
    pub readiness: ReadinessConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
        }
    }
}

/// Database connection parameters
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Hostname, optionally with a `:port` suffix
    pub host: String,
    /// Port used when `host` carries none
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Schema name
    pub name: String,
    /// Bound on connecting and running the test query
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DATABASE_HOST.to_string(),
            port: DEFAULT_DATABASE_PORT,
            username: DEFAULT_DATABASE_USERNAME.to_string(),
            password: DEFAULT_DATABASE_PASSWORD.to_string(),
            name: DEFAULT_DATABASE_NAME.to_string(),
            connect_timeout_seconds: DEFAULT_DATABASE_TIMEOUT_SECS,
        }
    }
}

impl DatabaseConfig {
    /// Split `host` into hostname and port, honouring a `host:port` form.
    ///
    /// An empty port (`db:`) falls back to `port`. A port that is not a
    /// number leaves `host` unsplit; `validate` rejects that form.
    pub fn endpoint(&self) -> (&str, u16) {
        match self.host.rsplit_once(':') {
            Some((host, "")) if !host.is_empty() && !host.contains(':') => (host, self.port),
            Some((host, port)) if !host.is_empty() && !host.contains(':') => {
                match port.parse::<u16>() {
                    Ok(port) => (host, port),
                    Err(_) => (self.host.as_str(), self.port),
                }
            }
            _ => (self.host.as_str(), self.port),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

// Keep the password out of logs and panic messages
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .finish()
    }
}

/// Web server process and loopback probe settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebServerConfig {
    pub process_name: String,
    pub url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            process_name: DEFAULT_PROCESS_NAME.to_string(),
            url: DEFAULT_WEBSERVER_URL.to_string(),
            timeout_seconds: DEFAULT_WEBSERVER_TIMEOUT_SECS,
            user_agent: DEFAULT_PROBE_USER_AGENT.to_string(),
        }
    }
}

impl WebServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesystemConfig {
    /// Directories that must exist and accept new files
    pub critical_dirs: Vec<PathBuf>,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            critical_dirs: DEFAULT_CRITICAL_DIRS.iter().map(PathBuf::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub marker_path: PathBuf,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            marker_path: PathBuf::from(DEFAULT_READINESS_MARKER),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl ProbeConfig {
    /// Resolve the configuration used for the lifetime of the process.
    ///
    /// Reads `path` when given, then applies the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Override database settings from an environment lookup.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(host) = get(ENV_DATABASE_HOST) {
            self.database.host = host;
        }
        if let Some(username) = get(ENV_DATABASE_USERNAME) {
            self.database.username = username;
        }
        if let Some(password) = get(ENV_DATABASE_PASSWORD) {
            self.database.password = password;
        }
        if let Some(name) = get(ENV_DATABASE_DBNAME) {
            self.database.name = name;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webserver.process_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "webserver.process_name must not be empty".to_string(),
            ));
        }
        let (db_host, _) = self.database.endpoint();
        // A single colon left after splitting means an unusable port
        if db_host.trim().is_empty() || db_host.matches(':').count() == 1 {
            return Err(ConfigError::Validation(format!(
                "database.host must be a hostname or host:port, got {:?}",
                self.database.host
            )));
        }
        if self.webserver.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "webserver.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.database.connect_timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "database.connect_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if !self.webserver.url.starts_with("http://") && !self.webserver.url.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "webserver.url must be an http(s) URL, got {}",
                self.webserver.url
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
