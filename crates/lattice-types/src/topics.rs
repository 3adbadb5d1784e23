//! # Lattice Topics
//!
//! Bus subjects a provider listens on, derived from its host data.
//! Layout: `wasmbus.rpc.{prefix}.{provider_key}.{link_name}[.suffix]`.

use crate::HostData;

/// Subjects for one provider instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Health checks.
    pub health: String,
    /// Link establishment.
    pub linkdefs_put: String,
    /// Link removal.
    pub linkdefs_del: String,
    /// Link listing; reserved, not subscribed.
    pub linkdefs_get: String,
    /// Shutdown requests.
    pub shutdown: String,
    /// Inbound invocations from linked peers.
    pub invocations: String,
}

impl Topics {
    /// Build every subject for the provider described by `host`.
    #[must_use]
    pub fn from_host_data(host: &HostData) -> Self {
        let base = format!(
            "wasmbus.rpc.{}.{}.{}",
            host.lattice_rpc_prefix,
            host.provider_key,
            host.link_name()
        );
        Self {
            health: format!("{base}.health"),
            linkdefs_put: format!("{base}.linkdefs.put"),
            linkdefs_del: format!("{base}.linkdefs.del"),
            linkdefs_get: format!("{base}.linkdefs.get"),
            shutdown: format!("{base}.shutdown"),
            invocations: base,
        }
    }

    /// Subject an outbound call to `target_key` is sent on.
    #[must_use]
    pub fn outbound(lattice_rpc_prefix: &str, target_key: &str) -> String {
        format!("wasmbus.rpc.{lattice_rpc_prefix}.{target_key}")
    }
}
