//! Tracing subscriber setup.

use std::io;

use kindred_core::config::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `config.level`.
pub fn init(config: &LoggingConfig) -> Result<(), InitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let builder = fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
