//! Error types for the provider runtime.

use lattice_bus::BusError;
use lattice_crypto::CryptoError;
use lattice_types::ProviderState;
use lattice_wire::WireError;
use std::time::Duration;
use thiserror::Error;

/// Host data could not be obtained. Fatal: the provider cannot start.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("No host data received within {0:?}")]
    Timeout(Duration),

    #[error("Host data is not valid: {0}")]
    Decode(String),

    #[error("Failed to read host data: {0}")]
    Io(#[from] std::io::Error),
}

/// A link callback refused a link. The registry was left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("Link callback failed for {source_id} -> {target}: {reason}")]
    Callback {
        source_id: String,
        target: String,
        reason: String,
    },
}

/// Everything the runtime can fail with.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error("Transport error: {0}")]
    Bus(#[from] BusError),

    #[error("Codec error: {0}")]
    Wire(#[from] WireError),

    #[error("Claims error: {0}")]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("Invalid control payload: {0}")]
    ControlPayload(#[from] serde_json::Error),

    /// Invocation rejected; no reply is sent.
    #[error("Unauthorized invocation: {0}")]
    Authorization(String),

    #[error("Operation not allowed while {0}")]
    InvalidState(ProviderState),

    /// The callee answered with an error string.
    #[error("Remote error: {0}")]
    Remote(String),
}
