//! # Lattice Telemetry
//!
//! Logging bootstrap for capability providers. The host decides the level
//! and the output shape through `HostData`; this crate turns that into a
//! `tracing` subscriber.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lattice_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_host_data(&host_data);
//! init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WASMBUS_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `WASMBUS_JSON_LOGS` | `false` | Emit JSON lines |
//! | `WASMBUS_SERVICE_NAME` | `capability-provider` | Service name field |

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;

pub use config::{level_directive, TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("A global subscriber is already installed")]
    AlreadyInitialized,

    #[error("Invalid configuration: {0}")]
    Config(String),
}
