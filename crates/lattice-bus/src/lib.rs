//! # Lattice Bus - Subject-Based Messaging for Providers
//!
//! The provider runtime talks to the lattice only through the
//! [`LatticeBus`] port. [`NatsConnector`] opens it over a NATS broker, the
//! way a provider launched by a host connects. [`InMemoryLattice`] is the
//! in-process lattice behind `memory://` URLs: subject wildcards,
//! request/reply over private inboxes, fast `NoResponders` failures and
//! draining unsubscribes, all without a broker.
//!
//! ```text
//! ┌──────────────┐  publish(subject)   ┌──────────────────┐
//! │  Connection  │ ──────────────────► │  Subject table   │
//! │  (client A)  │                     │  pattern → queue │
//! └──────────────┘                     └────────┬─────────┘
//!                                               │ try_send
//!                                               ▼
//!                                      ┌──────────────────┐
//!                                      │   Subscription   │
//!                                      │   (client B)     │
//!                                      └──────────────────┘
//! ```
//!
//! ## Drain semantics
//!
//! Unsubscribing removes the route at the bus, so no new messages arrive,
//! but messages already queued on the [`Subscription`] are still returned
//! by [`Subscription::next`] before it yields `None`.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod errors;
pub mod memory;
pub mod message;
pub mod nats;
pub mod port;
pub mod subject;
pub mod subscription;

pub use errors::BusError;
pub use memory::{InMemoryConnection, InMemoryLattice};
pub use message::Message;
pub use nats::{NatsConnection, NatsConnector, NonceSigner, DEFAULT_LATTICE_URL};
pub use port::{BusConnector, LatticeBus};
pub use subscription::{Subscription, SubscriptionId};

/// Messages buffered per subscription before new ones are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Prefix of private reply subjects.
pub const INBOX_PREFIX: &str = "_INBOX";
