use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub cors: CorsSettings,
    pub client: ClientSettings,
    pub logging: LoggingSettings,
}

/// The deployment environment, read from `APP_ENV` or `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum AppEnvironment {
    Development,
    Production,
    Test,
}

impl AppEnvironment {
    /// Filter used when `RUST_LOG` is not set.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            AppEnvironment::Development => "info",
            AppEnvironment::Production | AppEnvironment::Test => "warn",
        }
    }
}

/// Parameters of the HTTP listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub port: u16,
    pub environment: AppEnvironment,
    /// Largest accepted request body.
    pub body_limit_bytes: usize,
}

impl ServerSettings {
    /// Production listens on every interface, everything else on loopback only.
    pub fn host(&self) -> IpAddr {
        match self.environment {
            AppEnvironment::Production => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            _ => IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host(), self.port)
    }
}

/// PostgreSQL connection pool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Empty when only the API client is used.
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Cross-origin policy of the web server.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Exact origins allowed to call the API with credentials.
    pub allowed_origins: Vec<String>,
}

/// Settings of the HTTP API client used by the CLI and the editor.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    /// Base URL including the `/api` prefix.
    pub api_base_url: String,
    pub timeout_secs: u64,
}

impl ClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}
