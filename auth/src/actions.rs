//! Orchestrator actions.
//!
//! Commands come from the facade; the remaining variants are results fed
//! back by effects. Every result carries the `attempt` it belongs to so a
//! restarted or signed-out handshake ignores stale results.

use crate::context::ResolvedContext;
use crate::error::AuthError;
use crate::providers::{SessionChange, VerifyResponse};
use crate::state::{Session, User};

/// Input of the auth orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    // ═══════════════════════════════════════════════════════════
    // Commands
    // ═══════════════════════════════════════════════════════════
    /// Start (or restart) the handshake.
    Initialize,

    /// Read the session already installed in the session store.
    RestoreSession,

    /// End the session and tear the host transport down.
    SignOut,

    // ═══════════════════════════════════════════════════════════
    // Effect results
    // ═══════════════════════════════════════════════════════════
    /// Tenant resolution finished.
    ContextResolved {
        /// Attempt the result belongs to
        attempt: u64,
        /// Resolved context, `None` when no tenant could be determined
        context: Option<ResolvedContext>,
    },

    /// Backend verification finished.
    VerificationCompleted {
        /// Attempt the result belongs to
        attempt: u64,
        /// Backend answer or transport-level failure
        result: Result<VerifyResponse, AuthError>,
    },

    /// Credentials were installed.
    SessionEstablished {
        /// Attempt the result belongs to
        attempt: u64,
        /// Session user
        user: User,
        /// Installed session
        session: Session,
    },

    /// Credentials could not be installed.
    SessionEstablishFailed {
        /// Attempt the result belongs to
        attempt: u64,
        /// Why installation failed
        reason: String,
    },

    /// An effect failed unexpectedly.
    InternalFailure {
        /// Attempt the failure belongs to
        attempt: u64,
        /// Diagnostic message (not shown to the user)
        message: String,
    },

    /// The session store reported a change.
    SessionChanged(SessionChange),

    /// Session restore finished.
    SessionRestored {
        /// Installed session, if any
        current: Option<(User, Session)>,
        /// Whether the page is a platform dashboard route
        on_platform_route: bool,
    },

    /// Sign-out finished.
    SignedOut,
}

impl AuthAction {
    /// Attempt an effect result belongs to, `None` for commands and
    /// attempt-independent notifications.
    #[must_use]
    pub const fn attempt(&self) -> Option<u64> {
        match self {
            Self::ContextResolved { attempt, .. }
            | Self::VerificationCompleted { attempt, .. }
            | Self::SessionEstablished { attempt, .. }
            | Self::SessionEstablishFailed { attempt, .. }
            | Self::InternalFailure { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_of_results() {
        let action = AuthAction::ContextResolved {
            attempt: 3,
            context: None,
        };
        assert_eq!(action.attempt(), Some(3));
        assert_eq!(AuthAction::Initialize.attempt(), None);
        assert_eq!(AuthAction::SessionChanged(SessionChange::SignedOut).attempt(), None);
    }
}
