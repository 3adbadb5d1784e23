//! # Interface Link Definitions
//!
//! A link wires a source component to a target component over one interface.
//! Links are replaced wholesale when they change; they are never patched.

use crate::DEFAULT_LINK_NAME;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A declared wiring between two components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceLinkDefinition {
    /// Component that initiates calls over the link.
    pub source_id: String,
    /// Component that receives calls over the link.
    pub target: String,
    /// Link name.
    pub name: String,
    /// Interface namespace, e.g. `wasi`.
    pub wit_namespace: String,
    /// Interface package, e.g. `keyvalue`.
    pub wit_package: String,
    /// Interfaces carried by the link.
    pub interfaces: Vec<String>,
    /// Configuration handed to the source side.
    pub source_config: HashMap<String, String>,
    /// Configuration handed to the target side.
    pub target_config: HashMap<String, String>,
}

impl Default for InterfaceLinkDefinition {
    fn default() -> Self {
        Self {
            source_id: String::new(),
            target: String::new(),
            name: DEFAULT_LINK_NAME.to_string(),
            wit_namespace: String::new(),
            wit_package: String::new(),
            interfaces: Vec::new(),
            source_config: HashMap::new(),
            target_config: HashMap::new(),
        }
    }
}

impl InterfaceLinkDefinition {
    /// Link between `source_id` and `target` on the default link name.
    pub fn new(source_id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            target: target.into(),
            ..Self::default()
        }
    }

    /// Set the interface namespace and package.
    #[must_use]
    pub fn with_interface(
        mut self,
        namespace: impl Into<String>,
        package: impl Into<String>,
        interfaces: &[&str],
    ) -> Self {
        self.wit_namespace = namespace.into();
        self.wit_package = package.into();
        self.interfaces = interfaces.iter().map(|i| (*i).to_string()).collect();
        self
    }

    /// `namespace:package`, the contract this link speaks.
    #[must_use]
    pub fn contract(&self) -> String {
        format!("{}:{}", self.wit_namespace, self.wit_package)
    }
}
