//! Bus error types.

use std::time::Duration;
use thiserror::Error;

/// Transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The broker could not be reached.
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    /// The connection has been closed.
    #[error("Connection closed")]
    Closed,

    /// A request found nobody listening on its subject.
    #[error("No responders on {0}")]
    NoResponders(String),

    /// A request received no reply in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The subject is empty, has empty tokens or misplaced wildcards.
    #[error("Invalid subject: {0:?}")]
    InvalidSubject(String),

    /// The broker rejected or failed an operation.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The subscription was removed and its queue is empty.
    #[error("Subscription closed")]
    SubscriptionClosed,
}
