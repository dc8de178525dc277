//! Configuration management for Kindred.

mod sub_configs;


use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub use sub_configs::{
    ElasticConfig, IngestConfig, LoggingConfig, RecommendConfig, ServerConfig,
};

/// Environment variable prefix; nested keys use `__`, e.g. `KINDRED__ELASTIC__PASSWORD`.
pub const ENV_PREFIX: &str = "KINDRED";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub elastic: ElasticConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order:
    /// 1. config/default.toml (base settings)
    /// 2. config/{KINDRED_ENV}.toml (environment-specific)
    /// 3. Environment variables with KINDRED__ prefix
    pub fn load() -> CoreResult<Self> {
        let env = std::env::var("KINDRED_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| CoreError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate every section. Fails on the first invalid value.
    pub fn validate(&self) -> CoreResult<()> {
        self.server.validate()?;
        self.elastic.validate()?;
        self.ingest.validate()?;
        self.recommend.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
