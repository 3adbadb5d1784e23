//! # Provider Handlers
//!
//! The business logic of a concrete provider plugs into the runtime through
//! one [`ProviderHandlers`] value handed over at construction time. Every
//! callback has a no-op default, so a provider only sets what it cares
//! about.
//!
//! ```rust,ignore
//! let handlers = ProviderHandlers::new()
//!     .on_target_link_put(|link| {
//!         tracing::info!(actor = %link.source_id, "actor linked");
//!         Ok(())
//!     })
//!     .with_health_message("serving")
//!     .on_invocation(|action| async move { anyhow::Ok(action.msg) });
//! ```
//!
//! Link callbacks run while the link registry lock is held and must be
//! fast.

use futures::future::BoxFuture;
use futures::FutureExt;
use lattice_types::{HealthCheckResponse, InterfaceLinkDefinition, ProviderAction};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Health message used when the provider does not set one.
pub const DEFAULT_HEALTH_MESSAGE: &str = "healthy";

/// Called when a link is established or removed.
pub type LinkCallback = Arc<dyn Fn(&InterfaceLinkDefinition) -> anyhow::Result<()> + Send + Sync>;

/// Answers a health check.
pub type HealthCallback = Arc<dyn Fn() -> HealthCheckResponse + Send + Sync>;

/// Runs when the host asks the provider to stop.
pub type ShutdownCallback = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Serves one authorized inbound invocation.
pub type InvocationHandler =
    Arc<dyn Fn(ProviderAction) -> BoxFuture<'static, anyhow::Result<Vec<u8>>> + Send + Sync>;

/// Callbacks supplied by the provider's business logic.
#[derive(Clone)]
pub struct ProviderHandlers {
    pub(crate) source_link_put: LinkCallback,
    pub(crate) source_link_del: LinkCallback,
    pub(crate) target_link_put: LinkCallback,
    pub(crate) target_link_del: LinkCallback,
    pub(crate) health: HealthCallback,
    pub(crate) shutdown: ShutdownCallback,
    pub(crate) invocation: InvocationHandler,
}

fn accept_link(_: &InterfaceLinkDefinition) -> anyhow::Result<()> {
    Ok(())
}

fn no_shutdown_hook() -> anyhow::Result<()> {
    Ok(())
}

fn unhandled(action: ProviderAction) -> BoxFuture<'static, anyhow::Result<Vec<u8>>> {
    async move { Err(anyhow::anyhow!("no handler for operation {}", action.operation)) }.boxed()
}

impl Default for ProviderHandlers {
    fn default() -> Self {
        Self {
            source_link_put: Arc::new(accept_link),
            source_link_del: Arc::new(accept_link),
            target_link_put: Arc::new(accept_link),
            target_link_del: Arc::new(accept_link),
            health: Arc::new(|| HealthCheckResponse::healthy(DEFAULT_HEALTH_MESSAGE)),
            shutdown: Arc::new(no_shutdown_hook),
            invocation: Arc::new(unhandled),
        }
    }
}

impl ProviderHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// This provider linked to a target (it is the caller).
    #[must_use]
    pub fn on_source_link_put<F>(mut self, f: F) -> Self
    where
        F: Fn(&InterfaceLinkDefinition) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.source_link_put = Arc::new(f);
        self
    }

    #[must_use]
    pub fn on_source_link_del<F>(mut self, f: F) -> Self
    where
        F: Fn(&InterfaceLinkDefinition) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.source_link_del = Arc::new(f);
        self
    }

    /// A component linked to this provider (it will be called).
    #[must_use]
    pub fn on_target_link_put<F>(mut self, f: F) -> Self
    where
        F: Fn(&InterfaceLinkDefinition) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.target_link_put = Arc::new(f);
        self
    }

    #[must_use]
    pub fn on_target_link_del<F>(mut self, f: F) -> Self
    where
        F: Fn(&InterfaceLinkDefinition) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.target_link_del = Arc::new(f);
        self
    }

    #[must_use]
    pub fn on_health<F>(mut self, f: F) -> Self
    where
        F: Fn() -> HealthCheckResponse + Send + Sync + 'static,
    {
        self.health = Arc::new(f);
        self
    }

    /// Always healthy, reporting `message`.
    #[must_use]
    pub fn with_health_message(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.on_health(move || HealthCheckResponse::healthy(message.clone()))
    }

    #[must_use]
    pub fn on_shutdown<F>(mut self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.shutdown = Arc::new(f);
        self
    }

    /// Business logic for inbound invocations. An `Err` is reported to the
    /// caller as the response error string.
    #[must_use]
    pub fn on_invocation<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ProviderAction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
    {
        self.invocation = Arc::new(move |action: ProviderAction| f(action).boxed());
        self
    }
}

impl fmt::Debug for ProviderHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandlers").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_health() {
        let handlers = ProviderHandlers::default();
        assert_eq!(
            (handlers.health)(),
            HealthCheckResponse::healthy(DEFAULT_HEALTH_MESSAGE)
        );
    }

    #[test]
    fn test_health_message() {
        let handlers = ProviderHandlers::new().with_health_message("serving");
        assert_eq!((handlers.health)(), HealthCheckResponse::healthy("serving"));
    }

    #[tokio::test]
    async fn test_default_invocation_reports_missing_handler() {
        let handlers = ProviderHandlers::default();
        let action = ProviderAction {
            operation: "KeyValue.Get".to_string(),
            msg: Vec::new(),
            from_actor: "A1".to_string(),
        };
        let err = (handlers.invocation)(action).await.unwrap_err();
        assert!(err.to_string().contains("KeyValue.Get"));
    }

    #[tokio::test]
    async fn test_custom_invocation() {
        let handlers =
            ProviderHandlers::new().on_invocation(|action| async move { anyhow::Ok(action.msg) });
        let action = ProviderAction {
            operation: "Echo".to_string(),
            msg: b"hi".to_vec(),
            from_actor: "A1".to_string(),
        };
        assert_eq!((handlers.invocation)(action).await.unwrap(), b"hi".to_vec());
    }
}
