//! # Capability Provider Test Suite
//!
//! Cross-crate tests driving a real [`provider_runtime::ProviderRuntime`]
//! over the in-process lattice, the way a host and its actors would.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs        # Provider + host + actor connections
//!     ├── lifecycle.rs      # Bootstrap, links, health, shutdown
//!     ├── invocations.rs    # Inbound dispatch and outbound signed calls
//!     └── wire_contract.rs  # Payload formats as a host sends them
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p provider-tests
//! cargo test -p provider-tests integration::lifecycle::
//! ```

#![allow(dead_code)]

pub mod integration;
