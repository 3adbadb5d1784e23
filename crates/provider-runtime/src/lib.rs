//! # Provider Runtime - Capability Provider Protocol Engine
//!
//! Everything a capability provider needs to take part in the lattice,
//! minus its business logic, which plugs in through [`ProviderHandlers`].
//!
//! ## Data Flow
//!
//! ```text
//! stdin ──► Bootstrapper ──HostData──► ProviderRuntime ──► LinkRegistry
//!                                          │    ▲
//!                       control/invocation │    │ replies
//!                              messages    ▼    │
//!                                     LatticeBus (subjects)
//!                                          ▲
//!             outbound: Invocation ──sign──┴──encode──► request
//! ```
//!
//! ## Modules
//!
//! - `bootstrap` - one-shot host data acquisition with a deadline, and the
//!   broker connector it configures
//! - `registry` - source/target link bookkeeping and callbacks
//! - `handlers` - callbacks supplied by the provider
//! - `config` - contract id and control payload format
//! - `runtime` - lifecycle state machine, dispatch and outbound calls

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod registry;
pub mod runtime;

pub use bootstrap::{decode_host_data, lattice_connector, Bootstrapper, BOOTSTRAP_TIMEOUT};
pub use config::{ControlFormat, ProviderConfig};
pub use errors::{BootstrapError, LinkError, ProviderError};
pub use handlers::{ProviderHandlers, DEFAULT_HEALTH_MESSAGE};
pub use registry::{LinkOutcome, LinkRegistry, LinkRole};
pub use runtime::ProviderRuntime;

pub use lattice_types::ProviderState;
