//! Subscriber installation.
//!
//! JSON output carries `timestamp`, `level`, `target`, `fields` and the span
//! list, one object per line, so a log shipper can parse it without a
//! custom grammar.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber described by `config`.
///
/// Logs go to stderr; stdout stays free for the host protocol. Returns
/// [`TelemetryError::AlreadyInitialized`] when another subscriber won.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(e.to_string()))?;

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|_| TelemetryError::AlreadyInitialized)?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_ansi(config.ansi);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|_| TelemetryError::AlreadyInitialized)?;
    }

    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}
