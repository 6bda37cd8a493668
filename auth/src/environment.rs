//! Authentication environment.
//!
//! Everything the orchestrator reducer touches outside its own state is
//! injected here.

use crate::config::EmbedConfig;
use crate::context::ContextResolver;
use crate::error::Result;
use crate::providers::{SessionStore, VerificationBackend};
use std::sync::Arc;
use whop_embed_core::environment::{Clock, SystemClock};
use whop_embed_transport::{FrameWindow, TransportClient};

/// Authentication environment.
///
/// # Type Parameters
///
/// - `V`: verification backend
/// - `S`: session store
pub struct AuthEnvironment<V, S> {
    /// Tenant resolution, owns the host transport.
    pub resolver: Arc<ContextResolver>,

    /// Backend verification.
    pub verifier: Arc<V>,

    /// Session store.
    pub sessions: Arc<S>,

    /// Time source for `authenticated_at`.
    pub clock: Arc<dyn Clock>,
}

impl<V, S> AuthEnvironment<V, S>
where
    V: VerificationBackend,
    S: SessionStore,
{
    /// Build an environment for `window` from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`](crate::AuthError::Config) if the
    /// configuration is invalid.
    pub fn new(
        window: Arc<dyn FrameWindow>,
        config: &EmbedConfig,
        verifier: V,
        sessions: S,
    ) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(TransportClient::new(window, config.transport.clone()));
        let resolver = ContextResolver::new(transport, config.tenant_rules()?);

        Ok(Self::from_parts(Arc::new(resolver), Arc::new(verifier), Arc::new(sessions)))
    }

    /// Assemble an environment from shared parts.
    #[must_use]
    pub fn from_parts(resolver: Arc<ContextResolver>, verifier: Arc<V>, sessions: Arc<S>) -> Self {
        Self {
            resolver,
            verifier,
            sessions,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The host transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<TransportClient> {
        self.resolver.transport()
    }
}

impl<V, S> Clone for AuthEnvironment<V, S> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            verifier: Arc::clone(&self.verifier),
            sessions: Arc::clone(&self.sessions),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<V, S> std::fmt::Debug for AuthEnvironment<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEnvironment")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
