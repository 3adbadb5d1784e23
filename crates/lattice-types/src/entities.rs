//! # Invocation Entities
//!
//! The values that travel with every cross-process call on the lattice.
//!
//! ## Clusters
//!
//! - **Identity**: [`Entity`], [`EntityKind`]
//! - **Calls**: [`Invocation`], [`InvocationResponse`], [`TraceContext`]
//! - **Dispatch**: [`ProviderAction`], [`ProviderResponse`]
//! - **Lifecycle**: [`HealthCheckResponse`]

use serde::{Deserialize, Serialize};

// =============================================================================
// IDENTITY
// =============================================================================

/// Discriminant of an [`Entity`] as carried by the explicit wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A WebAssembly component.
    Actor = 0,
    /// An out-of-process capability provider.
    Provider = 1,
}

impl EntityKind {
    /// Wire tag for this kind.
    #[must_use]
    pub fn tag(self) -> i8 {
        self as i8
    }

    /// Resolve a wire tag, `None` if the tag is not a known kind.
    #[must_use]
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(Self::Actor),
            1 => Some(Self::Provider),
            _ => None,
        }
    }
}

/// Origin or target of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entity {
    /// An actor, identified by its public key only.
    Actor {
        /// Actor public key.
        public_key: String,
    },
    /// A provider instance, bound to one link name and one contract.
    Provider {
        /// Provider public key.
        public_key: String,
        /// Link name the provider instance serves.
        link_name: String,
        /// Capability contract, e.g. `wasmcloud:keyvalue`.
        contract_id: String,
    },
}

impl Entity {
    /// Build an actor entity.
    pub fn actor(public_key: impl Into<String>) -> Self {
        Self::Actor {
            public_key: public_key.into(),
        }
    }

    /// Build a provider entity.
    pub fn provider(
        public_key: impl Into<String>,
        link_name: impl Into<String>,
        contract_id: impl Into<String>,
    ) -> Self {
        Self::Provider {
            public_key: public_key.into(),
            link_name: link_name.into(),
            contract_id: contract_id.into(),
        }
    }

    /// Kind of this entity.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Actor { .. } => EntityKind::Actor,
            Self::Provider { .. } => EntityKind::Provider,
        }
    }

    /// Public key of either variant.
    #[must_use]
    pub fn public_key(&self) -> &str {
        match self {
            Self::Actor { public_key } | Self::Provider { public_key, .. } => public_key,
        }
    }

    /// Link name, empty for actors.
    #[must_use]
    pub fn link_name(&self) -> &str {
        match self {
            Self::Actor { .. } => "",
            Self::Provider { link_name, .. } => link_name,
        }
    }

    /// Contract id, empty for actors.
    #[must_use]
    pub fn contract_id(&self) -> &str {
        match self {
            Self::Actor { .. } => "",
            Self::Provider { contract_id, .. } => contract_id,
        }
    }
}

// =============================================================================
// CALLS
// =============================================================================

/// Ordered trace-context key/value pairs propagated with an invocation.
pub type TraceContext = Vec<(String, String)>;

/// One cross-component call envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Caller.
    pub origin: Entity,
    /// Callee.
    pub target: Entity,
    /// Operation name, e.g. `KeyValue.Get`.
    pub operation: String,
    /// Raw request payload.
    pub msg: Vec<u8>,
    /// Globally unique call id.
    pub id: String,
    /// Signed claims token binding origin, target and payload.
    pub encoded_claims: String,
    /// Host the call was issued from.
    pub host_id: String,
    /// Length of `msg` in bytes.
    pub content_length: u64,
    /// Propagated trace context.
    pub trace_context: TraceContext,
}

impl Invocation {
    /// Build an unsigned invocation. `content_length` is derived from `msg`.
    pub fn new(
        origin: Entity,
        target: Entity,
        operation: impl Into<String>,
        msg: Vec<u8>,
        id: impl Into<String>,
    ) -> Self {
        let content_length = msg.len() as u64;
        Self {
            origin,
            target,
            operation: operation.into(),
            msg,
            id: id.into(),
            encoded_claims: String::new(),
            host_id: String::new(),
            content_length,
            trace_context: TraceContext::new(),
        }
    }

    /// Set the source host id.
    #[must_use]
    pub fn with_host_id(mut self, host_id: impl Into<String>) -> Self {
        self.host_id = host_id.into();
        self
    }
}

/// Reply to an [`Invocation`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationResponse {
    /// Raw response payload.
    pub msg: Vec<u8>,
    /// Id of the invocation this answers.
    pub invocation_id: String,
    /// Error reported by the callee, if any.
    pub error: Option<String>,
    /// Length of `msg` in bytes.
    pub content_length: u64,
}

impl InvocationResponse {
    /// Successful response carrying `msg`.
    pub fn success(invocation_id: impl Into<String>, msg: Vec<u8>) -> Self {
        let content_length = msg.len() as u64;
        Self {
            msg,
            invocation_id: invocation_id.into(),
            error: None,
            content_length,
        }
    }

    /// Failed response carrying only an error string.
    pub fn failure(invocation_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            msg: Vec::new(),
            invocation_id: invocation_id.into(),
            error: Some(error.into()),
            content_length: 0,
        }
    }
}

/// An authorized inbound invocation as handed to provider business logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAction {
    /// Operation name.
    pub operation: String,
    /// Raw request payload.
    pub msg: Vec<u8>,
    /// Public key of the calling actor.
    pub from_actor: String,
}

/// Result of provider business logic for one [`ProviderAction`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderResponse {
    /// Raw response payload.
    pub msg: Vec<u8>,
    /// Application-level error, reported back to the caller.
    pub error: Option<String>,
}

impl ProviderResponse {
    /// Response carrying `msg`.
    pub fn ok(msg: impl Into<Vec<u8>>) -> Self {
        Self {
            msg: msg.into(),
            error: None,
        }
    }

    /// Response carrying only an error.
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            msg: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Wrap as the reply to invocation `invocation_id`.
    #[must_use]
    pub fn into_invocation_response(self, invocation_id: impl Into<String>) -> InvocationResponse {
        let content_length = self.msg.len() as u64;
        InvocationResponse {
            msg: self.msg,
            invocation_id: invocation_id.into(),
            error: self.error,
            content_length,
        }
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Answer to a health check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Whether the provider considers itself healthy.
    pub healthy: bool,
    /// Free-text status message.
    #[serde(default)]
    pub message: String,
}

impl HealthCheckResponse {
    /// Healthy response with a message.
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: message.into(),
        }
    }

    /// Unhealthy response with a message.
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
        }
    }
}
