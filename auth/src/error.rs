//! Error types for the embedded authentication handshake.

use crate::constants::messages;
use thiserror::Error;
use whop_embed_transport::TransportError;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failure modes of one initialization attempt.
///
/// Every variant reduces to the single `AuthState::error` string through
/// [`AuthError::user_message`]; nothing propagates past the orchestrator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Neither the host nor the URL yielded a tenant id.
    #[error("tenant could not be resolved")]
    TenantUnresolved,

    /// The backend answered and refused verification.
    #[error("backend verification failed: {}", message.as_deref().unwrap_or("no reason given"))]
    BackendVerificationFailed {
        /// Message returned by the backend, if any
        message: Option<String>,
    },

    /// The backend could not be reached or answered garbage.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Credentials could not be installed into the session store.
    #[error("failed to establish session: {0}")]
    SessionEstablishFailed(String),

    /// Session store operation failed.
    #[error("session store error: {0}")]
    SessionStore(String),

    /// Host transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// The message published to the presentation layer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::TenantUnresolved => messages::TENANT_UNRESOLVED.to_string(),
            Self::BackendVerificationFailed { message: Some(message) }
            | Self::BackendUnavailable(message)
                if !message.is_empty() =>
            {
                message.clone()
            },
            Self::SessionEstablishFailed(_) => messages::SESSION_ESTABLISH_FAILED.to_string(),
            _ => messages::AUTHENTICATION_FAILED.to_string(),
        }
    }

    /// Short label used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TenantUnresolved => "tenant_unresolved",
            Self::BackendVerificationFailed { .. } => "verification_failed",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::SessionEstablishFailed(_) => "session_establish_failed",
            Self::SessionStore(_) => "session_store",
            Self::Transport(_) => "transport",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}
