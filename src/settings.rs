use config::{Config, ConfigError};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub notifier: Option<NotifierSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    /// Public base URL deployments are viewed under, e.g. "https://deploys.example.com".
    /// Injected into whatever renders display URLs; never read from global state.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierSettings {
    /// Endpoint that receives status notification payloads.
    pub webhook_url: String,
}

impl Settings {
    /// Loads layered configuration: `default` (required), then the run-mode
    /// file, then `local`, then `DRYDOCK_*` environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("DRYDOCK_CONFIG_RUN_MODE").unwrap_or_else(|_| "development".into());
        let config_dir = env::var("DRYDOCK_CONFIG_DIR").unwrap_or_else(|_| "config".into());

        let config = Config::builder()
            .add_source(config::File::with_name(&format!("{}/default", config_dir)))
            .add_source(
                config::File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false),
            )
            .add_source(config::File::with_name(&format!("{}/local", config_dir)).required(false))
            .add_source(config::Environment::with_prefix("DRYDOCK").separator("__"))
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;

        // DATABASE_URL takes precedence over file configuration (common convention).
        if let Ok(database_url) = env::var("DATABASE_URL") {
            if !database_url.is_empty() {
                settings.database.url = database_url;
            }
        }

        if settings.database.url.is_empty() {
            return Err(ConfigError::Message(
                "Database URL not configured. Set DATABASE_URL environment variable or [database] url in config".to_string(),
            ));
        }

        if settings.server.base_url.is_empty() {
            return Err(ConfigError::Message(
                "Base URL not configured. Set [server] base_url in config".to_string(),
            ));
        }

        Ok(settings)
    }
}
