use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AppEnvironment, ClientSettings, CorsSettings, DatabaseSettings, LoggingSettings,
    ServerSettings, Settings,
};

/// Origin of the hosted front end, allowed when `CORS_ORIGINS` is not set.
pub const DEFAULT_CORS_ORIGIN: &str = "https://price-list-module.vercel.app";

/// Environment variables and the setting each one overrides.
const ENV_OVERRIDES: [(&str, &str); 6] = [
    ("PORT", "server.port"),
    ("DATABASE_URL", "database.url"),
    ("DATABASE_MAX_CONNECTIONS", "database.max_connections"),
    ("API_BASE_URL", "client.api_base_url"),
    ("LOG_DIR", "logging.directory"),
    ("BODY_LIMIT_BYTES", "server.body_limit_bytes"),
];

/// Loads the application settings.
///
/// Layers, lowest precedence first: compiled defaults, an optional
/// `config.toml` in the working directory, then the process environment.
/// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(
        config::File::with_name("config").required(false),
        |key| std::env::var(key).ok(),
    )
}

/// Loads settings from an explicit file source and environment lookup.
pub fn load_settings_from<S, F>(file: S, env: F) -> Result<Settings, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    let mut builder = config::Config::builder()
        .set_default("server.port", 3001_i64)?
        .set_default("server.environment", "development")?
        .set_default("server.body_limit_bytes", 1_048_576_i64)?
        .set_default("database.url", "")?
        .set_default("database.max_connections", 10_i64)?
        .set_default("database.acquire_timeout_secs", 5_i64)?
        .set_default("cors.allowed_origins", vec![DEFAULT_CORS_ORIGIN])?
        .set_default("client.api_base_url", "http://localhost:3001/api")?
        .set_default("client.timeout_secs", 30_i64)?
        .set_default("logging.file_prefix", "price-list.log")?
        .add_source(file);

    for (var, key) in ENV_OVERRIDES {
        builder = builder.set_override_option(key, env(var).filter(|v| !v.is_empty()))?;
    }

    // APP_ENV wins over the NODE_ENV name the hosted deployment uses.
    let environment = env("APP_ENV")
        .or_else(|| env("NODE_ENV"))
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());
    builder = builder.set_override_option("server.environment", environment)?;

    if let Some(origins) = env("CORS_ORIGINS") {
        let origins: Vec<String> = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        builder = builder.set_override("cors.allowed_origins", origins)?;
    }

    let settings = builder.build()?.try_deserialize::<Settings>()?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.database.max_connections == 0 {
        return Err(ConfigError::ValidationError(
            "database.max_connections must be at least 1".to_string(),
        ));
    }
    if settings.server.body_limit_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "server.body_limit_bytes must be positive".to_string(),
        ));
    }
    if settings.client.api_base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "client.api_base_url must not be empty".to_string(),
        ));
    }
    if settings.cors.allowed_origins.iter().any(|o| o == "*") {
        return Err(ConfigError::ValidationError(
            "cors.allowed_origins cannot contain '*' because credentials are allowed".to_string(),
        ));
    }
    Ok(())
}

impl DatabaseSettings {
    /// The connection string, required by anything that opens a pool.
    pub fn require_url(&self) -> Result<&str, ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "DATABASE_URL must be set".to_string(),
            ));
        }
        Ok(&self.url)
    }
}
