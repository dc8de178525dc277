//! Sub-configuration structures for Kindred components.
//!
//! This module contains all the individual configuration structs
//! that make up the main `Config` structure.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address (default: "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Listen port (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.bind_address.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "server.bind_address cannot be empty".into(),
            ));
        }
        if self.port == 0 {
            return Err(CoreError::ConfigError(
                "server.port must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Elasticsearch connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElasticConfig {
    /// Cluster endpoint (default: "https://localhost:9200")
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Collection holding the profile documents (default: "users")
    #[serde(default = "default_index")]
    pub index: String,

    /// Basic auth user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Accept self-signed certificates. Local development clusters only.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_endpoint() -> String {
    "https://localhost:9200".to_string()
}

fn default_index() -> String {
    "users".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            index: default_index(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: false,
        }
    }
}

impl ElasticConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(CoreError::ConfigError(format!(
                "elastic.endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.index.is_empty() {
            return Err(CoreError::ConfigError("elastic.index cannot be empty".into()));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(CoreError::ConfigError(
                "elastic.password is set but elastic.username is missing".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(CoreError::ConfigError(
                "elastic.timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Batch ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Records per bulk request (default: 100)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Submissions per batch before giving up on overload, first one included (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between overload retries in milliseconds (default: 2000)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Number of synthetic profiles generated by the seeding endpoint (default: 100000)
    #[serde(default = "default_synthetic_count")]
    pub synthetic_count: usize,

    /// Upper bound on profiles a single seeding request may ask for (default: 1000000)
    #[serde(default = "default_max_synthetic_count")]
    pub max_synthetic_count: usize,

    /// Seed for the synthetic profile generator (default: 0)
    #[serde(default)]
    pub seed: u64,
}

fn default_batch_size() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

fn default_synthetic_count() -> usize {
    100_000
}

fn default_max_synthetic_count() -> usize {
    1_000_000
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            synthetic_count: default_synthetic_count(),
            max_synthetic_count: default_max_synthetic_count(),
            seed: 0,
        }
    }
}

impl IngestConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.batch_size == 0 {
            return Err(CoreError::ConfigError(
                "ingest.batch_size must be greater than 0".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(CoreError::ConfigError(
                "ingest.max_attempts must be at least 1".into(),
            ));
        }
        if self.max_synthetic_count == 0 {
            return Err(CoreError::ConfigError(
                "ingest.max_synthetic_count must be greater than 0".into(),
            ));
        }
        if self.synthetic_count > self.max_synthetic_count {
            return Err(CoreError::ConfigError(format!(
                "ingest.synthetic_count ({}) exceeds ingest.max_synthetic_count ({})",
                self.synthetic_count, self.max_synthetic_count
            )));
        }
        Ok(())
    }
}

/// Recommendation query configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecommendConfig {
    /// Fields compared by the similarity query (default: ["interests", "hobbies"])
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    /// Maximum recommendations returned (default: 10)
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Minimum term frequency in the subject document (default: 1)
    #[serde(default = "default_min_term_freq")]
    pub min_term_freq: u32,

    /// Maximum terms selected per query (default: 12)
    #[serde(default = "default_max_query_terms")]
    pub max_query_terms: u32,
}

fn default_fields() -> Vec<String> {
    vec!["interests".to_string(), "hobbies".to_string()]
}

fn default_max_results() -> usize {
    10
}

fn default_min_term_freq() -> u32 {
    1
}

fn default_max_query_terms() -> u32 {
    12
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            fields: default_fields(),
            max_results: default_max_results(),
            min_term_freq: default_min_term_freq(),
            max_query_terms: default_max_query_terms(),
        }
    }
}

impl RecommendConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.fields.is_empty() {
            return Err(CoreError::ConfigError(
                "recommend.fields must name at least one field".into(),
            ));
        }
        if self.max_results == 0 || self.max_results > 10 {
            return Err(CoreError::ConfigError(format!(
                "recommend.max_results must be in 1..=10, got {}",
                self.max_results
            )));
        }
        if self.max_query_terms == 0 {
            return Err(CoreError::ConfigError(
                "recommend.max_query_terms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset (default: "info")
    #[serde(default = "default_level")]
    pub level: String,

    /// "pretty" or "json" (default: "pretty")
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default)]
    pub include_location: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> CoreResult<()> {
        match self.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(CoreError::ConfigError(format!(
                "logging.format must be \"pretty\" or \"json\", got \"{}\"",
                other
            ))),
        }
    }
}
