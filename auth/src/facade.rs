//! Presentation-facing entry point.

use crate::actions::AuthAction;
use crate::environment::AuthEnvironment;
use crate::error::{AuthError, Result};
use crate::host::{ExternalNavigation, open_external_url};
use crate::providers::{SessionStore, VerificationBackend};
use crate::reducers::AuthOrchestrator;
use crate::state::AuthState;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use whop_embed_runtime::{Store, StoreError};

/// Store running the orchestrator.
pub type AuthStore<V, S> = Store<AuthState, AuthAction, AuthEnvironment<V, S>, AuthOrchestrator<V, S>>;

fn store_error(error: &StoreError) -> AuthError {
    AuthError::Internal(error.to_string())
}

/// Embedded authentication handle.
///
/// Owns the store and the task forwarding session store notifications into
/// it. Dropping the handle stops the forwarder.
///
/// # Example
///
/// ```ignore
/// let env = AuthEnvironment::new(window, &config, config.http_verifier()?, sessions)?;
/// let auth = EmbeddedAuth::start(env);
///
/// auth.restore_session().await?;
/// if !auth.initialize().await {
///     let error = auth.state().await.error;
///     // show `error` with a "Try Again" button wired to `auth.retry()`
/// }
/// ```
pub struct EmbeddedAuth<V, S>
where
    V: VerificationBackend + 'static,
    S: SessionStore + 'static,
{
    store: AuthStore<V, S>,
    forwarder: JoinHandle<()>,
}

impl<V, S> EmbeddedAuth<V, S>
where
    V: VerificationBackend + 'static,
    S: SessionStore + 'static,
{
    /// Start the store and subscribe to the session store.
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn start(env: AuthEnvironment<V, S>) -> Self {
        let mut changes = env.sessions.subscribe();
        let store = Store::new(AuthState::default(), AuthOrchestrator::new(), env);

        let forwarder = tokio::spawn({
            let store = store.clone();
            async move {
                while let Some(change) = changes.recv().await {
                    if let Err(error) = store.send(AuthAction::SessionChanged(change)).await {
                        tracing::debug!(%error, "Session change forwarder stopped");
                        break;
                    }
                }
            }
        });

        Self { store, forwarder }
    }

    /// Run the handshake. Returns whether it ended authenticated.
    ///
    /// Calling it while an attempt is in flight restarts the handshake; both
    /// callers observe the outcome of the latest attempt.
    pub async fn initialize(&self) -> bool {
        let mut states = self.store.subscribe_state();
        if let Err(error) = self.store.send(AuthAction::Initialize).await {
            tracing::warn!(%error, "Initialization rejected");
            return false;
        }
        let target = self.store.state(|state| state.attempt).await;

        let settled = states
            .wait_for(|state| state.attempt >= target && !state.is_loading)
            .await
            .map(|state| state.is_authenticated);
        match settled {
            Ok(authenticated) => authenticated,
            Err(_) => self.store.state(|state| state.is_authenticated).await,
        }
    }

    /// Run the handshake again after a failure.
    pub async fn retry(&self) -> bool {
        self.initialize().await
    }

    /// Pick up a session installed before the app mounted.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the store is shutting down.
    pub async fn restore_session(&self) -> Result<()> {
        self.send_and_settle(AuthAction::RestoreSession).await
    }

    /// Sign out and release the host transport.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the store is shutting down.
    pub async fn sign_out(&self) -> Result<()> {
        self.send_and_settle(AuthAction::SignOut).await
    }

    /// Open `url` outside the frame, through the host when embedded.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the direct navigation is refused.
    pub async fn open_external_url(&self, url: &str, new_tab: bool) -> Result<ExternalNavigation> {
        open_external_url(self.store.environment().transport(), url, new_tab).await
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> AuthState {
        self.store.state(Clone::clone).await
    }

    /// Watch every published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.store.subscribe_state()
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &AuthStore<V, S> {
        &self.store
    }

    /// Stop accepting actions and wait for running effects.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if effects are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.forwarder.abort();
        self.store.shutdown(timeout).await.map_err(|e| store_error(&e))
    }

    async fn send_and_settle(&self, action: AuthAction) -> Result<()> {
        let mut handle = self.store.send(action).await.map_err(|e| store_error(&e))?;
        handle.wait().await;
        Ok(())
    }
}

impl<V, S> Drop for EmbeddedAuth<V, S>
where
    V: VerificationBackend + 'static,
    S: SessionStore + 'static,
{
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

impl<V, S> std::fmt::Debug for EmbeddedAuth<V, S>
where
    V: VerificationBackend + 'static,
    S: SessionStore + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedAuth")
            .field("forwarder_running", &!self.forwarder.is_finished())
            .finish_non_exhaustive()
    }
}
