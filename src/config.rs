use serde::Deserialize;
use std::env;

use crate::services::conf::{SqlConf, CREDENTIALS_ENABLED_KEY, JDBC_PRINCIPAL_KEY, JDBC_URL_KEY};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub live: LiveConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Live connection settings seeded into each context's registry
#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    pub jdbc_url: Option<String>,
    pub principal: Option<String>,
    pub credentials_enabled: bool,
    pub hive_user: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Try to load from .env file
        let _ = dotenv::dotenv();

        let mut builder = config::Config::builder()
            .set_default("database.url", "./metastore.db")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("live.credentials_enabled", false)?
            .set_default("logging.level", "info")?;

        if let Ok(database_url) = env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", database_url)?;
        }

        if let Ok(host) = env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.port", port.parse::<u16>().unwrap_or(3000))?;
        }

        if let Ok(url) = env::var("HIVESERVER2_JDBC_URL") {
            builder = builder.set_override("live.jdbc_url", Some(url))?;
        }

        if let Ok(principal) = env::var("HIVESERVER2_JDBC_URL_PRINCIPAL") {
            builder = builder.set_override("live.principal", Some(principal))?;
        }

        if let Ok(enabled) = env::var("CREDENTIALS_HIVESERVER2_ENABLED") {
            builder = builder.set_override(
                "live.credentials_enabled",
                enabled.trim().eq_ignore_ascii_case("true"),
            )?;
        }

        if let Ok(user) = env::var("HIVE_USER") {
            builder = builder.set_override("live.hive_user", Some(user))?;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            builder = builder.set_override("logging.level", log_level)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Registry seeded with the live connection keys
    pub fn sql_conf(&self) -> SqlConf {
        let optional = [
            (JDBC_URL_KEY, &self.live.jdbc_url),
            (JDBC_PRINCIPAL_KEY, &self.live.principal),
        ];
        let pairs = optional
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
            .chain([(
                CREDENTIALS_ENABLED_KEY.to_string(),
                self.live.credentials_enabled.to_string(),
            )]);
        SqlConf::from_pairs(pairs)
    }
}
