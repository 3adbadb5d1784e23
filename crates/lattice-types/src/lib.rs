//! # Lattice Types Crate
//!
//! This crate contains the domain entities a capability provider exchanges
//! with the lattice host and with its peers.
//!
//! ## Design Principles
//!
//! - **Closed identities**: an [`Entity`] is always either an actor or a
//!   provider; there is no empty variant.
//! - **Wholesale links**: an [`InterfaceLinkDefinition`] is never patched, a
//!   changed link is delivered again as a new value.
//! - **Redaction by default**: secret material is wrapped in
//!   [`RedactedString`] so it cannot leak through logs.

pub mod entities;
pub mod errors;
pub mod host;
pub mod link;
pub mod topics;

pub use entities::*;
pub use errors::*;
pub use host::*;
pub use link::*;
pub use topics::Topics;

/// Link name used when the host does not supply one.
pub const DEFAULT_LINK_NAME: &str = "default";
