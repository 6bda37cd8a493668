//! Auth orchestrator reducer.
//!
//! Drives the embedded handshake:
//!
//! ```text
//! Idle ──Initialize──▶ Resolving ──context──▶ Verifying ──ok──▶ EstablishingSession ──▶ Authenticated
//!                          │                      │                      │
//!                          └──── none ────────────┴──── refused ─────────┴──── failed ──▶ Failed
//! ```
//!
//! # Rules
//!
//! - `Initialize` may arrive at any time. It bumps `attempt`, so results of
//!   an earlier attempt still in flight are ignored when they come back.
//! - Every attempt ends with `is_loading == false`, including when an effect
//!   panics.
//! - Session store notifications always update `user`/`session` but only flip
//!   `is_authenticated` when no attempt is in flight and the last attempt did
//!   not fail.
//! - `SignOut` clears identity, drops the session and tears down the host
//!   transport.

use crate::actions::AuthAction;
use crate::environment::AuthEnvironment;
use crate::error::AuthError;
use crate::metrics::AuthMetrics;
use crate::providers::{SessionChange, SessionStore, SessionTokens, VerificationBackend, VerifyResponse};
use crate::state::{AuthPhase, AuthState, Session, User};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use whop_embed_core::effect::Effect;
use whop_embed_core::environment::Clock;
use whop_embed_core::reducer::Reducer;
use whop_embed_core::{SmallVec, async_effect, smallvec};

/// Reducer of the embedded authentication handshake.
pub struct AuthOrchestrator<V, S> {
    _phantom: PhantomData<fn() -> (V, S)>,
}

impl<V, S> AuthOrchestrator<V, S> {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<V, S> Default for AuthOrchestrator<V, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> Clone for AuthOrchestrator<V, S> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V, S> std::fmt::Debug for AuthOrchestrator<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthOrchestrator")
    }
}

/// Run `fut` as an effect of `attempt`; a panic becomes
/// [`AuthAction::InternalFailure`].
fn guarded<F>(attempt: u64, fut: F) -> Effect<AuthAction>
where
    F: Future<Output = AuthAction> + Send + 'static,
{
    async_effect! {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(action) => Some(action),
            Err(panic) => Some(AuthAction::InternalFailure {
                attempt,
                message: panic_message(panic.as_ref()),
            }),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "effect panicked".to_string())
}

/// Record a failed attempt.
fn fail(state: &mut AuthState, error: &AuthError) -> SmallVec<[Effect<AuthAction>; 4]> {
    state.is_loading = false;
    state.is_authenticated = false;
    state.error = Some(error.user_message());
    state.phase = AuthPhase::Failed;

    AuthMetrics::record_failure(error.kind());
    tracing::warn!(attempt = state.attempt, kind = error.kind(), %error, "Authentication failed");

    smallvec![Effect::None]
}

/// Whether a session notification or restore may mark the state authenticated.
///
/// On a platform route only `initialize` may authenticate from `Idle`; an
/// authenticated state keeps accepting refreshes.
fn may_authenticate(state: &AuthState, on_platform_route: bool) -> bool {
    if state.is_loading || state.error.is_some() {
        return false;
    }
    match state.phase {
        AuthPhase::Authenticated => true,
        AuthPhase::Idle => !on_platform_route,
        _ => false,
    }
}

impl<V, S> AuthOrchestrator<V, S>
where
    V: VerificationBackend + 'static,
    S: SessionStore + 'static,
{
    fn verify_effect(
        env: &AuthEnvironment<V, S>,
        attempt: u64,
        state: &AuthState,
    ) -> Effect<AuthAction> {
        let Some(company_id) = state.company_id.clone() else {
            return Effect::None;
        };
        let verifier = Arc::clone(&env.verifier);

        guarded(attempt, async move {
            let result = verifier.verify(&company_id).await;
            AuthAction::VerificationCompleted { attempt, result }
        })
    }

    fn establish_effect(
        env: &AuthEnvironment<V, S>,
        attempt: u64,
        tokens: Option<SessionTokens>,
    ) -> Effect<AuthAction> {
        let sessions = Arc::clone(&env.sessions);

        guarded(attempt, async move {
            let installed = match tokens {
                Some(tokens) => sessions.set_session(&tokens).await.map(Some),
                None => {
                    tracing::debug!("Verification returned no tokens, reading current session");
                    sessions.current_session().await
                },
            };
            match installed {
                Ok(Some((user, session))) => AuthAction::SessionEstablished {
                    attempt,
                    user,
                    session,
                },
                Ok(None) => AuthAction::SessionEstablishFailed {
                    attempt,
                    reason: "no session after verification".to_string(),
                },
                Err(error) => AuthAction::SessionEstablishFailed {
                    attempt,
                    reason: error.to_string(),
                },
            }
        })
    }

    fn on_verified(
        state: &mut AuthState,
        response: VerifyResponse,
        env: &AuthEnvironment<V, S>,
    ) -> SmallVec<[Effect<AuthAction>; 4]> {
        if !response.success {
            return fail(
                state,
                &AuthError::BackendVerificationFailed {
                    message: response.error,
                },
            );
        }

        state.external_user = response.whop_user;
        state.company = response.company;
        state.phase = AuthPhase::EstablishingSession;
        tracing::debug!(attempt = state.attempt, "Company verified, establishing session");

        smallvec![Self::establish_effect(env, state.attempt, response.session)]
    }

    fn accept_session(state: &mut AuthState, user: User, session: Session, env: &AuthEnvironment<V, S>) {
        if !state.is_authenticated {
            state.authenticated_at = Some(env.clock.now());
        }
        state.user = Some(user);
        state.session = Some(session);
        state.is_authenticated = true;
        state.phase = AuthPhase::Authenticated;
    }
}

impl<V, S> Reducer for AuthOrchestrator<V, S>
where
    V: VerificationBackend + 'static,
    S: SessionStore + 'static,
{
    type State = AuthState;
    type Action = AuthAction;
    type Environment = AuthEnvironment<V, S>;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let stale = |attempt: &u64| *attempt != state.attempt || !state.is_loading;
        if let Some(attempt) = action.attempt().filter(stale) {
            tracing::debug!(attempt, current = state.attempt, "Ignoring stale result");
            return smallvec![Effect::None];
        }

        match action {
            // ═══════════════════════════════════════════════════════════════
            // Initialize: start or restart the handshake
            // ═══════════════════════════════════════════════════════════════
            AuthAction::Initialize => {
                state.attempt += 1;
                let attempt = state.attempt;
                state.is_loading = true;
                state.is_authenticated = false;
                state.error = None;
                state.phase = AuthPhase::Resolving;

                AuthMetrics::record_initialization();
                tracing::info!(attempt, "Initializing embedded authentication");

                let resolver = Arc::clone(&env.resolver);
                smallvec![guarded(attempt, async move {
                    let context = resolver.resolve().await;
                    AuthAction::ContextResolved { attempt, context }
                })]
            },

            AuthAction::ContextResolved { attempt, context } => {
                let Some(context) = context else {
                    state.is_embedded = false;
                    return fail(state, &AuthError::TenantUnresolved);
                };

                tracing::debug!(
                    attempt,
                    company_id = %context.company_id,
                    source = ?context.source,
                    "Tenant resolved"
                );
                state.is_embedded = true;
                state.company_id = Some(context.company_id);
                state.experience_id = Some(context.experience_id);
                state.view_type = Some(context.view_type);
                state.phase = AuthPhase::Verifying;

                smallvec![Self::verify_effect(env, attempt, state)]
            },

            AuthAction::VerificationCompleted { result, .. } => match result {
                Ok(response) => Self::on_verified(state, response, env),
                Err(error) => fail(state, &error),
            },

            AuthAction::SessionEstablished { user, session, .. } => {
                state.is_loading = false;
                state.error = None;
                tracing::info!(attempt = state.attempt, user_id = %user.id, "Authenticated");
                Self::accept_session(state, user, session, env);
                AuthMetrics::record_success();
                smallvec![Effect::None]
            },

            AuthAction::SessionEstablishFailed { reason, .. } => {
                fail(state, &AuthError::SessionEstablishFailed(reason))
            },

            AuthAction::InternalFailure { attempt, message } => {
                tracing::error!(attempt, %message, "Authentication effect failed");
                fail(state, &AuthError::Internal(message))
            },

            // ═══════════════════════════════════════════════════════════════
            // Session store notifications
            // ═══════════════════════════════════════════════════════════════
            AuthAction::SessionChanged(change) => {
                AuthMetrics::record_session_change(change.kind());
                tracing::debug!(
                    kind = change.kind(),
                    loading = state.is_loading,
                    "Session changed"
                );

                match change {
                    SessionChange::SignedIn { user, session }
                    | SessionChange::TokenRefreshed { user, session } => {
                        let on_platform_route =
                            env.resolver.rules().is_platform_route(&env.resolver.location());
                        if may_authenticate(state, on_platform_route) {
                            Self::accept_session(state, user, session, env);
                        } else {
                            state.user = Some(user);
                            state.session = Some(session);
                        }
                    },
                    SessionChange::SignedOut => {
                        state.user = None;
                        state.session = None;
                        if !state.is_loading {
                            state.is_authenticated = false;
                            state.authenticated_at = None;
                            if state.phase == AuthPhase::Authenticated {
                                state.phase = AuthPhase::Idle;
                            }
                        }
                    },
                }
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════════
            // RestoreSession: pick up a session installed before mount
            // ═══════════════════════════════════════════════════════════════
            AuthAction::RestoreSession => {
                let resolver = Arc::clone(&env.resolver);
                let sessions = Arc::clone(&env.sessions);

                smallvec![async_effect! {
                    let on_platform_route = resolver.rules().is_platform_route(&resolver.location());
                    let current = match sessions.current_session().await {
                        Ok(current) => current,
                        Err(error) => {
                            tracing::warn!(%error, "Could not read current session");
                            None
                        },
                    };
                    Some(AuthAction::SessionRestored {
                        current,
                        on_platform_route,
                    })
                }]
            },

            AuthAction::SessionRestored {
                current,
                on_platform_route,
            } => {
                match current {
                    Some((user, session)) => {
                        if may_authenticate(state, on_platform_route) {
                            tracing::debug!(user_id = %user.id, "Restored existing session");
                            Self::accept_session(state, user, session, env);
                        } else {
                            state.user = Some(user);
                            state.session = Some(session);
                        }
                    },
                    None if !state.is_loading => {
                        state.user = None;
                        state.session = None;
                        state.is_authenticated = false;
                        state.authenticated_at = None;
                        if state.phase == AuthPhase::Authenticated {
                            state.phase = AuthPhase::Idle;
                        }
                    },
                    None => {},
                }
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════════
            // SignOut: full lifecycle reset
            // ═══════════════════════════════════════════════════════════════
            AuthAction::SignOut => {
                state.attempt += 1;
                state.clear_identity();
                state.is_loading = false;
                state.error = None;
                state.phase = AuthPhase::Idle;

                AuthMetrics::record_sign_out();
                tracing::info!("Signing out");

                let sessions = Arc::clone(&env.sessions);
                let transport = Arc::clone(env.transport());
                smallvec![async_effect! {
                    if let Err(error) = sessions.sign_out().await {
                        tracing::warn!(%error, "Session store sign-out failed");
                    }
                    let disposed = transport.teardown();
                    tracing::debug!(disposed, "Host transport released");
                    Some(AuthAction::SignedOut)
                }]
            },

            AuthAction::SignedOut => smallvec![Effect::None],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::EmbedConfig;
    use crate::constants::messages;
    use crate::context::{CompanyId, ContextSource, ResolvedContext, ViewType};
    use crate::mocks::{MemorySessionStore, MockVerifier};
    use url::Url;
    use whop_embed_testing::mocks::test_clock;
    use whop_embed_testing::{ReducerTest, assertions};
    use whop_embed_transport::mocks::MockFrameWindow;

    type TestEnv = AuthEnvironment<MockVerifier, MemorySessionStore>;
    type TestOrchestrator = AuthOrchestrator<MockVerifier, MemorySessionStore>;

    fn env() -> TestEnv {
        env_at("https://app.example.com/")
    }

    fn env_at(location: &str) -> TestEnv {
        let window = MockFrameWindow::top_level(Url::parse(location).unwrap());
        AuthEnvironment::new(
            Arc::new(window),
            &EmbedConfig::default(),
            MockVerifier::approving(),
            MemorySessionStore::new(),
        )
        .unwrap()
        .with_clock(Arc::new(test_clock()))
    }

    fn user() -> User {
        User {
            id: "user_1".to_string(),
            email: Some("ada@example.com".to_string()),
        }
    }

    fn session() -> Session {
        Session {
            user_id: "user_1".to_string(),
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_at: None,
        }
    }

    fn context() -> ResolvedContext {
        ResolvedContext {
            company_id: CompanyId::new("biz_AB12cd"),
            experience_id: "exp_1".to_string(),
            view_type: ViewType::Admin,
            source: ContextSource::Host,
        }
    }

    /// State in the middle of attempt `attempt`.
    fn loading(attempt: u64, phase: AuthPhase) -> AuthState {
        AuthState {
            is_loading: true,
            phase,
            attempt,
            ..AuthState::default()
        }
    }

    #[test]
    fn test_initialize_starts_loading() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(AuthState {
                error: Some("old".to_string()),
                phase: AuthPhase::Failed,
                ..AuthState::default()
            })
            .when_action(AuthAction::Initialize)
            .then_state(|state| {
                assert!(state.is_loading);
                assert!(state.error.is_none());
                assert_eq!(state.phase, AuthPhase::Resolving);
                assert_eq!(state.attempt, 1);
                assert!(state.is_consistent());
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_initialize_while_loading_restarts() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(loading(1, AuthPhase::Verifying))
            .when_action(AuthAction::Initialize)
            .then_state(|state| {
                assert_eq!(state.attempt, 2);
                assert_eq!(state.phase, AuthPhase::Resolving);
            })
            .run();
    }

    #[test]
    fn test_unresolved_tenant_fails() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(loading(1, AuthPhase::Resolving))
            .when_action(AuthAction::ContextResolved {
                attempt: 1,
                context: None,
            })
            .then_state(|state| {
                assert!(!state.is_loading);
                assert!(!state.is_authenticated);
                assert_eq!(state.error.as_deref(), Some(messages::TENANT_UNRESOLVED));
                assert_eq!(state.phase, AuthPhase::Failed);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_resolved_context_starts_verification() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(loading(1, AuthPhase::Resolving))
            .when_action(AuthAction::ContextResolved {
                attempt: 1,
                context: Some(context()),
            })
            .then_state(|state| {
                assert!(state.is_embedded);
                assert_eq!(state.company_id, Some(CompanyId::new("biz_AB12cd")));
                assert_eq!(state.experience_id.as_deref(), Some("exp_1"));
                assert_eq!(state.view_type, Some(ViewType::Admin));
                assert_eq!(state.phase, AuthPhase::Verifying);
                assert!(state.is_loading);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_refusal_publishes_backend_message() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(loading(1, AuthPhase::Verifying))
            .when_action(AuthAction::VerificationCompleted {
                attempt: 1,
                result: Ok(VerifyResponse {
                    success: false,
                    error: Some("denied".to_string()),
                    ..VerifyResponse::default()
                }),
            })
            .then_state(|state| {
                assert!(!state.is_authenticated);
                assert!(!state.is_loading);
                assert_eq!(state.error.as_deref(), Some("denied"));
            })
            .run();
    }

    #[test]
    fn test_unreachable_backend_uses_its_message() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(loading(1, AuthPhase::Verifying))
            .when_action(AuthAction::VerificationCompleted {
                attempt: 1,
                result: Err(AuthError::BackendUnavailable("connection refused".to_string())),
            })
            .then_state(|state| {
                assert_eq!(state.error.as_deref(), Some("connection refused"));
                assert_eq!(state.phase, AuthPhase::Failed);
            })
            .run();
    }

    #[test]
    fn test_session_established_authenticates() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(loading(1, AuthPhase::EstablishingSession))
            .when_action(AuthAction::SessionEstablished {
                attempt: 1,
                user: user(),
                session: session(),
            })
            .then_state(|state| {
                assert!(state.is_authenticated);
                assert!(!state.is_loading);
                assert!(state.error.is_none());
                assert_eq!(state.authenticated_at, Some(test_clock().now()));
                assert!(state.is_consistent());
            })
            .run();
    }

    #[test]
    fn test_session_install_failure_has_distinct_message() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(loading(1, AuthPhase::EstablishingSession))
            .when_action(AuthAction::SessionEstablishFailed {
                attempt: 1,
                reason: "invalid refresh token".to_string(),
            })
            .then_state(|state| {
                assert!(!state.is_authenticated);
                assert_eq!(state.error.as_deref(), Some(messages::SESSION_ESTABLISH_FAILED));
            })
            .run();
    }

    #[test]
    fn test_stale_result_is_ignored() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(loading(2, AuthPhase::Resolving))
            .when_action(AuthAction::ContextResolved {
                attempt: 1,
                context: None,
            })
            .then_state(|state| {
                assert!(state.is_loading);
                assert!(state.error.is_none());
                assert_eq!(state.phase, AuthPhase::Resolving);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_session_change_while_loading_only_updates_credentials() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(loading(1, AuthPhase::Resolving))
            .when_action(AuthAction::SessionChanged(SessionChange::SignedIn {
                user: user(),
                session: session(),
            }))
            .then_state(|state| {
                assert!(state.has_credentials());
                assert!(!state.is_authenticated);
                assert!(state.is_loading);
                assert_eq!(state.phase, AuthPhase::Resolving);
            })
            .run();
    }

    #[test]
    fn test_session_change_when_idle_authenticates() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::SessionChanged(SessionChange::TokenRefreshed {
                user: user(),
                session: session(),
            }))
            .then_state(|state| {
                assert!(state.is_authenticated);
                assert_eq!(state.phase, AuthPhase::Authenticated);
                assert!(state.is_consistent());
            })
            .run();
    }

    #[test]
    fn test_session_change_on_platform_route_waits_for_initialize() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env_at("https://app.example.com/dashboard/biz_AB12cd"))
            .given_state(AuthState::default())
            .when_action(AuthAction::SessionChanged(SessionChange::SignedIn {
                user: user(),
                session: session(),
            }))
            .then_state(|state| {
                assert!(state.has_credentials());
                assert!(!state.is_authenticated);
                assert_eq!(state.phase, AuthPhase::Idle);
                assert!(state.authenticated_at.is_none());
            })
            .run();
    }

    #[test]
    fn test_refresh_on_platform_route_keeps_authentication() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env_at("https://app.example.com/dashboard/biz_AB12cd"))
            .given_state(AuthState {
                is_authenticated: true,
                is_embedded: true,
                user: Some(user()),
                session: Some(session()),
                company_id: Some(CompanyId::new("biz_AB12cd")),
                phase: AuthPhase::Authenticated,
                ..AuthState::default()
            })
            .when_action(AuthAction::SessionChanged(SessionChange::TokenRefreshed {
                user: user(),
                session: Session {
                    access_token: "at2".to_string(),
                    ..session()
                },
            }))
            .then_state(|state| {
                assert!(state.is_authenticated);
                assert_eq!(state.session.as_ref().unwrap().access_token, "at2");
            })
            .run();
    }

    #[test]
    fn test_session_change_after_failure_keeps_error() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(AuthState {
                error: Some("denied".to_string()),
                phase: AuthPhase::Failed,
                ..AuthState::default()
            })
            .when_action(AuthAction::SessionChanged(SessionChange::SignedIn {
                user: user(),
                session: session(),
            }))
            .then_state(|state| {
                assert!(!state.is_authenticated);
                assert_eq!(state.error.as_deref(), Some("denied"));
                assert!(state.has_credentials());
            })
            .run();
    }

    #[test]
    fn test_external_sign_out_drops_authentication() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(AuthState {
                is_authenticated: true,
                user: Some(user()),
                session: Some(session()),
                phase: AuthPhase::Authenticated,
                ..AuthState::default()
            })
            .when_action(AuthAction::SessionChanged(SessionChange::SignedOut))
            .then_state(|state| {
                assert!(!state.is_authenticated);
                assert!(!state.has_credentials());
                assert_eq!(state.phase, AuthPhase::Idle);
                assert!(state.is_consistent());
            })
            .run();
    }

    #[test]
    fn test_restored_session_on_platform_route_only_seeds() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::SessionRestored {
                current: Some((user(), session())),
                on_platform_route: true,
            })
            .then_state(|state| {
                assert!(state.has_credentials());
                assert!(!state.is_authenticated);
            })
            .run();
    }

    #[test]
    fn test_restored_session_elsewhere_authenticates() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::SessionRestored {
                current: Some((user(), session())),
                on_platform_route: false,
            })
            .then_state(|state| {
                assert!(state.is_authenticated);
                assert!(!state.is_loading);
            })
            .run();
    }

    #[test]
    fn test_internal_failure_ends_loading_with_generic_message() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(loading(1, AuthPhase::Verifying))
            .when_action(AuthAction::InternalFailure {
                attempt: 1,
                message: "boom".to_string(),
            })
            .then_state(|state| {
                assert!(!state.is_loading);
                assert_eq!(state.error.as_deref(), Some(messages::AUTHENTICATION_FAILED));
            })
            .run();
    }

    #[test]
    fn test_sign_out_resets_and_invalidates_attempt() {
        ReducerTest::new(TestOrchestrator::new())
            .with_env(env())
            .given_state(AuthState {
                is_authenticated: true,
                is_embedded: true,
                user: Some(user()),
                session: Some(session()),
                company_id: Some(CompanyId::new("biz_1")),
                phase: AuthPhase::Authenticated,
                attempt: 3,
                ..AuthState::default()
            })
            .when_action(AuthAction::SignOut)
            .then_state(|state| {
                assert_eq!(state.attempt, 4);
                assert!(!state.is_authenticated);
                assert!(!state.is_embedded);
                assert!(!state.has_credentials());
                assert!(state.company_id.is_none());
                assert_eq!(state.phase, AuthPhase::Idle);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    async fn explode() -> AuthAction {
        panic!("verifier exploded")
    }

    #[tokio::test]
    async fn test_guarded_converts_panic() {
        let effect = guarded(7, explode());
        let Effect::Future(fut) = effect else {
            panic!("expected a future effect");
        };
        assert_eq!(
            fut.await,
            Some(AuthAction::InternalFailure {
                attempt: 7,
                message: "verifier exploded".to_string(),
            })
        );
    }
}
