//! External collaborators of the handshake.
//!
//! The orchestrator never talks to a backend or a credential store directly;
//! it depends on these traits and the environment injects implementations.
//!
//! - [`VerificationBackend`]: verify a tenant and issue session credentials
//! - [`SessionStore`]: install, read, watch and drop the session
//!
//! Production wiring uses [`HttpVerifier`]; tests use the in-memory mocks.

use crate::context::CompanyId;
use crate::error::Result;
use crate::state::{Company, ExternalUser, Session, User};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tokio::sync::broadcast;

pub mod http;

pub use http::HttpVerifier;

/// Credentials issued by the backend.
///
/// `Debug` redacts the tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Bearer token
    pub access_token: String,
    /// Refresh token
    pub refresh_token: String,
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens").finish_non_exhaustive()
    }
}

/// Body sent to the verification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Tenant to verify
    pub company_id: CompanyId,
}

/// Answer of the verification endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether the tenant was verified
    #[serde(default)]
    pub success: bool,
    /// Reason for a refusal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Platform user profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whop_user: Option<ExternalUser>,
    /// Company profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
    /// Session credentials to install
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionTokens>,
}

/// Change notification emitted by a [`SessionStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// A session was installed
    SignedIn {
        /// Session user
        user: User,
        /// New session
        session: Session,
    },
    /// Tokens were refreshed
    TokenRefreshed {
        /// Session user
        user: User,
        /// Refreshed session
        session: Session,
    },
    /// The session ended
    SignedOut,
}

impl SessionChange {
    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SignedIn { .. } => "signed_in",
            Self::TokenRefreshed { .. } => "token_refreshed",
            Self::SignedOut => "signed_out",
        }
    }
}

/// Receiver of session change notifications.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct SessionSubscription {
    rx: broadcast::Receiver<SessionChange>,
}

impl SessionSubscription {
    /// Wrap a broadcast receiver.
    #[must_use]
    pub const fn new(rx: broadcast::Receiver<SessionChange>) -> Self {
        Self { rx }
    }

    /// Next change. Returns `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<SessionChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session change subscriber lagged");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Backend that verifies a tenant and issues session credentials.
pub trait VerificationBackend: Send + Sync {
    /// Verify `company_id`.
    ///
    /// A refusal is an `Ok` response with `success == false`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::BackendUnavailable`](crate::AuthError::BackendUnavailable)
    /// when the backend cannot be reached or answers garbage.
    fn verify(
        &self,
        company_id: &CompanyId,
    ) -> impl Future<Output = Result<VerifyResponse>> + Send;
}

/// Holder of the application's session.
///
/// # Implementation Notes
///
/// - Credentials are persisted by the store, never by the orchestrator
/// - Every change is broadcast to subscribers, including ones caused by
///   `set_session` and `sign_out`
pub trait SessionStore: Send + Sync {
    /// Install credentials.
    ///
    /// # Errors
    ///
    /// Returns error if the tokens are rejected or cannot be stored.
    fn set_session(
        &self,
        tokens: &SessionTokens,
    ) -> impl Future<Output = Result<(User, Session)>> + Send;

    /// The session currently installed, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    fn current_session(&self) -> impl Future<Output = Result<Option<(User, Session)>>> + Send;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> SessionSubscription;

    /// End the session.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be updated.
    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;
}
