//! Telemetry configuration from host data or environment variables.

use lattice_types::{HostData, Level};
use std::env;

/// Service name used when neither the host nor the environment supplies one.
pub const DEFAULT_SERVICE_NAME: &str = "capability-provider";

/// Filter directive for a host log level. `critical` has no tracing
/// equivalent and maps to `error`.
#[must_use]
pub fn level_directive(level: Level) -> &'static str {
    match level {
        Level::Error | Level::Critical => "error",
        Level::Warn => "warn",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
    }
}

/// Configuration for the logging subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup record
    pub service_name: String,

    /// `EnvFilter` directive (trace, debug, info, warn, error, or targets)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to color human-readable output
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            ansi: false,
        }
    }
}

impl TelemetryConfig {
    /// Configuration requested by the host.
    ///
    /// The provider key becomes the service name, the level defaults to
    /// `info` and `structured_logging` selects JSON output.
    pub fn from_host_data(host: &HostData) -> Self {
        let service_name = if host.provider_key.is_empty() {
            DEFAULT_SERVICE_NAME.to_string()
        } else {
            host.provider_key.clone()
        };

        Self {
            service_name,
            log_level: host
                .log_level
                .map_or("info", level_directive)
                .to_string(),
            json_logs: host.structured_logging,
            ansi: false,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WASMBUS_SERVICE_NAME`: Service name (default: capability-provider)
    /// - `WASMBUS_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `WASMBUS_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        let log_level = env::var("WASMBUS_LOG_LEVEL")
            .ok()
            .map(|raw| match raw.parse::<Level>() {
                Ok(level) => level_directive(level).to_string(),
                Err(_) => raw,
            })
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string());

        Self {
            service_name: env::var("WASMBUS_SERVICE_NAME")
                .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string()),
            log_level,
            json_logs: env::var("WASMBUS_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
            ansi: false,
        }
    }
}
