//! # Error Types
//!
//! Errors raised while interpreting host-supplied configuration.

use thiserror::Error;

/// A log level string the host sent is not one we understand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown log level: {0}")]
pub struct LevelParseError(pub String);

/// Provider lifecycle states, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderState {
    /// Waiting for host data.
    Bootstrapping,
    /// Connected, replaying persisted links.
    Linking,
    /// Serving control and invocation subscriptions.
    Running,
    /// Refusing new messages, finishing in-flight ones.
    Draining,
    /// Bus closed, `start` has returned.
    Terminated,
}

impl std::fmt::Display for ProviderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bootstrapping => "bootstrapping",
            Self::Linking => "linking",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}
