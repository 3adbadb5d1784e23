//! # Link Registry
//!
//! Tracks which components this provider is linked with.
//!
//! ```text
//! link.source_id == self ──► source_links[link.target]     (we call them)
//! link.target    == self ──► target_links[link.source_id]  (they call us)
//! otherwise              ──► ignored
//! ```
//!
//! One mutex guards both maps and is held across the provider callback, so
//! a link is stored only if its callback succeeded and removed only if its
//! removal callback succeeded.

use crate::errors::LinkError;
use crate::handlers::{LinkCallback, ProviderHandlers};
use lattice_types::InterfaceLinkDefinition;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Which side of a link this provider plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// This provider is the link source.
    Source,
    /// This provider is the link target.
    Target,
}

/// What a registry operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The link was stored after its callback succeeded.
    Established(LinkRole),
    /// The link was removed after its callback succeeded.
    Removed(LinkRole),
    /// Put of a pair that is already tracked; no callback ran.
    Duplicate,
    /// Delete of a pair that is not tracked; no callback ran.
    Unknown,
    /// The link does not involve this provider.
    Ignored,
}

#[derive(Debug, Default)]
struct LinkMaps {
    /// Keyed by target component id.
    source_links: HashMap<String, InterfaceLinkDefinition>,
    /// Keyed by source component id.
    target_links: HashMap<String, InterfaceLinkDefinition>,
}

impl LinkMaps {
    fn side(&mut self, role: LinkRole) -> &mut HashMap<String, InterfaceLinkDefinition> {
        match role {
            LinkRole::Source => &mut self.source_links,
            LinkRole::Target => &mut self.target_links,
        }
    }
}

/// Source and target links of one provider.
pub struct LinkRegistry {
    provider_key: String,
    handlers: ProviderHandlers,
    links: Mutex<LinkMaps>,
}

impl LinkRegistry {
    pub fn new(provider_key: impl Into<String>, handlers: ProviderHandlers) -> Self {
        Self {
            provider_key: provider_key.into(),
            handlers,
            links: Mutex::new(LinkMaps::default()),
        }
    }

    /// Role and map key of `link` from this provider's point of view.
    fn classify<'a>(&self, link: &'a InterfaceLinkDefinition) -> Option<(LinkRole, &'a str)> {
        if link.source_id == self.provider_key {
            Some((LinkRole::Source, link.target.as_str()))
        } else if link.target == self.provider_key {
            Some((LinkRole::Target, link.source_id.as_str()))
        } else {
            None
        }
    }

    fn callback_error(link: &InterfaceLinkDefinition, err: &anyhow::Error) -> LinkError {
        LinkError::Callback {
            source_id: link.source_id.clone(),
            target: link.target.clone(),
            reason: format!("{err:#}"),
        }
    }

    /// Establish `link`.
    ///
    /// A pair that is already tracked is acknowledged without running any
    /// callback. On callback failure nothing is stored.
    pub fn put(&self, link: &InterfaceLinkDefinition) -> Result<LinkOutcome, LinkError> {
        let Some((role, key)) = self.classify(link) else {
            warn!(
                source_id = %link.source_id,
                target = %link.target,
                provider = %self.provider_key,
                "Ignoring link that does not involve this provider"
            );
            return Ok(LinkOutcome::Ignored);
        };

        let mut links = self.links.lock();
        if links.side(role).contains_key(key) {
            debug!(source_id = %link.source_id, target = %link.target, "Link already tracked");
            return Ok(LinkOutcome::Duplicate);
        }

        let callback: &LinkCallback = match role {
            LinkRole::Source => &self.handlers.source_link_put,
            LinkRole::Target => &self.handlers.target_link_put,
        };
        callback(link).map_err(|e| Self::callback_error(link, &e))?;

        links.side(role).insert(key.to_string(), link.clone());
        info!(
            source_id = %link.source_id,
            target = %link.target,
            role = ?role,
            "Link established"
        );
        Ok(LinkOutcome::Established(role))
    }

    /// Remove `link`. The entry stays if the removal callback fails.
    pub fn delete(&self, link: &InterfaceLinkDefinition) -> Result<LinkOutcome, LinkError> {
        let Some((role, key)) = self.classify(link) else {
            warn!(
                source_id = %link.source_id,
                target = %link.target,
                provider = %self.provider_key,
                "Ignoring link removal that does not involve this provider"
            );
            return Ok(LinkOutcome::Ignored);
        };

        let mut links = self.links.lock();
        if !links.side(role).contains_key(key) {
            debug!(source_id = %link.source_id, target = %link.target, "Link not tracked");
            return Ok(LinkOutcome::Unknown);
        }

        let callback: &LinkCallback = match role {
            LinkRole::Source => &self.handlers.source_link_del,
            LinkRole::Target => &self.handlers.target_link_del,
        };
        callback(link).map_err(|e| Self::callback_error(link, &e))?;

        links.side(role).remove(key);
        info!(
            source_id = %link.source_id,
            target = %link.target,
            role = ?role,
            "Link removed"
        );
        Ok(LinkOutcome::Removed(role))
    }

    /// Whether `source` is linked to `target`.
    pub fn is_linked(&self, source: &str, target: &str) -> bool {
        let links = self.links.lock();
        if source == self.provider_key {
            links.source_links.contains_key(target)
        } else if target == self.provider_key {
            links.target_links.contains_key(source)
        } else {
            false
        }
    }

    /// Links where this provider is the source, keyed by target.
    pub fn source_links(&self) -> HashMap<String, InterfaceLinkDefinition> {
        self.links.lock().source_links.clone()
    }

    /// Links where this provider is the target, keyed by source.
    pub fn target_links(&self) -> HashMap<String, InterfaceLinkDefinition> {
        self.links.lock().target_links.clone()
    }
}
