//! Runtime configuration beyond what the host sends.

use crate::errors::ProviderError;
use lattice_types::{HealthCheckResponse, InterfaceLinkDefinition};
use lattice_wire::EntityTagging;

/// Encoding of link-put, link-del and health payloads.
///
/// Invocations are always MessagePack; only the control messages differ
/// between host versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControlFormat {
    #[default]
    MsgPack,
    Json,
}

/// Provider-side settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Contract this provider implements, e.g. `wasmcloud:keyvalue`.
    pub contract_id: String,
    pub control_format: ControlFormat,
    pub entity_tagging: EntityTagging,
}

impl ProviderConfig {
    /// Defaults for a provider of `contract_id`.
    pub fn new(contract_id: impl Into<String>) -> Self {
        Self {
            contract_id: contract_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_control_format(mut self, format: ControlFormat) -> Self {
        self.control_format = format;
        self
    }

    #[must_use]
    pub fn with_entity_tagging(mut self, tagging: EntityTagging) -> Self {
        self.entity_tagging = tagging;
        self
    }

    /// Decode a link-put or link-del payload.
    pub fn decode_link(&self, payload: &[u8]) -> Result<InterfaceLinkDefinition, ProviderError> {
        match self.control_format {
            ControlFormat::MsgPack => {
                Ok(lattice_wire::from_slice_with(payload, self.entity_tagging)?)
            }
            ControlFormat::Json => Ok(serde_json::from_slice(payload)?),
        }
    }

    /// Encode a link definition the way [`Self::decode_link`] reads it.
    pub fn encode_link(&self, link: &InterfaceLinkDefinition) -> Result<Vec<u8>, ProviderError> {
        match self.control_format {
            ControlFormat::MsgPack => Ok(lattice_wire::to_vec_with(link, self.entity_tagging)),
            ControlFormat::Json => Ok(serde_json::to_vec(link)?),
        }
    }

    /// Encode a health check reply.
    pub fn encode_health(&self, response: &HealthCheckResponse) -> Result<Vec<u8>, ProviderError> {
        match self.control_format {
            ControlFormat::MsgPack => Ok(lattice_wire::to_vec_with(response, self.entity_tagging)),
            ControlFormat::Json => Ok(serde_json::to_vec(response)?),
        }
    }

    /// Decode a health check reply.
    pub fn decode_health(&self, payload: &[u8]) -> Result<HealthCheckResponse, ProviderError> {
        match self.control_format {
            ControlFormat::MsgPack => {
                Ok(lattice_wire::from_slice_with(payload, self.entity_tagging)?)
            }
            ControlFormat::Json => Ok(serde_json::from_slice(payload)?),
        }
    }
}
