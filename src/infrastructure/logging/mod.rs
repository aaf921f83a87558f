// Logging module - Diagnostic logging setup
use crate::domain::config::GlobalConfig;
use crate::domain::error::{AtCommanderError, AtCommanderResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the diagnostic logging system.
///
/// Diagnostics go to stderr so the transcript on stdout stays clean.
/// `RUST_LOG` overrides the configured level when set.
pub fn init_logging(global: &GlobalConfig, verbose: bool) -> AtCommanderResult<()> {
    let level = if verbose { "debug" } else { global.log_level.as_str() };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("atcommander={}", level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .try_init()
        .map_err(|e| AtCommanderError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    Ok(())
}
