//! Published authentication state.

use crate::context::{CompanyId, ViewType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// User of the application's own session backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: String,
    /// Email, when known
    pub email: Option<String>,
}

/// Installed session.
///
/// `Debug` redacts the tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Owner of the session
    pub user_id: String,
    /// Bearer token
    pub access_token: String,
    /// Refresh token
    pub refresh_token: String,
    /// Expiry, when known
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// User profile on the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUser {
    /// Platform user id
    pub id: String,
    /// Email
    #[serde(default)]
    pub email: String,
    /// Display name
    #[serde(default)]
    pub name: String,
}

/// Company profile on the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Company id
    pub id: String,
    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Position in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthPhase {
    /// Nothing in flight
    #[default]
    Idle,
    /// Determining the tenant
    Resolving,
    /// Waiting for the backend
    Verifying,
    /// Installing credentials into the session store
    EstablishingSession,
    /// Handshake complete
    Authenticated,
    /// Handshake failed; `error` is set
    Failed,
}

impl AuthPhase {
    /// Whether an initialization is in flight.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Resolving | Self::Verifying | Self::EstablishingSession)
    }
}

/// Single source of truth for the presentation layer.
///
/// # Invariants
///
/// - `is_authenticated` implies `user` and `session` are both set
/// - `is_loading` holds exactly while an initialization is in flight
/// - `error` and `is_authenticated` are mutually exclusive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    /// A tenant context was resolved for this app
    pub is_embedded: bool,
    /// Handshake complete with a concrete user and session
    pub is_authenticated: bool,
    /// An initialization is in flight
    pub is_loading: bool,
    /// User-facing error of the last attempt
    pub error: Option<String>,
    /// Session user
    pub user: Option<User>,
    /// Installed session
    pub session: Option<Session>,
    /// Platform user returned by the backend
    pub external_user: Option<ExternalUser>,
    /// Acting company id
    pub company_id: Option<CompanyId>,
    /// Experience id from the host
    pub experience_id: Option<String>,
    /// Company profile returned by the backend
    pub company: Option<Company>,
    /// Requested view
    pub view_type: Option<ViewType>,
    /// Handshake phase
    pub phase: AuthPhase,
    /// Counter of initialization attempts; results of older attempts are ignored
    pub attempt: u64,
    /// When the current session was accepted
    pub authenticated_at: Option<DateTime<Utc>>,
}

impl AuthState {
    /// Whether both credentials are present.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.user.is_some() && self.session.is_some()
    }

    /// Check the published-state invariants.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let credentials = !self.is_authenticated || self.has_credentials();
        let loading = self.is_loading == self.phase.is_in_flight();
        let exclusive = !(self.is_authenticated && self.error.is_some());
        credentials && loading && exclusive
    }

    /// Drop every credential and identity field.
    pub fn clear_identity(&mut self) {
        self.is_embedded = false;
        self.is_authenticated = false;
        self.user = None;
        self.session = None;
        self.external_user = None;
        self.company_id = None;
        self.experience_id = None;
        self.company = None;
        self.view_type = None;
        self.authenticated_at = None;
    }
}
