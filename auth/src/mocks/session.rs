//! In-memory session store.

use crate::error::{AuthError, Result};
use crate::providers::{SessionChange, SessionStore, SessionSubscription, SessionTokens};
use crate::state::{Session, User};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

const CHANGE_CAPACITY: usize = 64;

#[derive(Debug)]
struct Inner {
    user: Mutex<User>,
    current: Mutex<Option<(User, Session)>>,
    fail_next_set: Mutex<Option<String>>,
    changes: broadcast::Sender<SessionChange>,
    set_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

/// Session store kept in memory.
///
/// `set_session` accepts any tokens for the configured user and emits
/// [`SessionChange::SignedIn`]; `sign_out` emits [`SessionChange::SignedOut`].
/// Clones share the same store.
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    inner: Arc<Inner>,
}

impl MemorySessionStore {
    /// Create an empty store for user `user_1`.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                user: Mutex::new(User {
                    id: "user_1".to_string(),
                    email: Some("user@example.com".to_string()),
                }),
                current: Mutex::new(None),
                fail_next_set: Mutex::new(None),
                changes,
                set_calls: AtomicUsize::new(0),
                sign_out_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Use `user` for installed sessions.
    #[must_use]
    pub fn with_user(self, user: User) -> Self {
        *self.inner.user.lock() = user;
        self
    }

    /// Make the next `set_session` fail with `message`.
    pub fn fail_next_set(&self, message: impl Into<String>) {
        *self.inner.fail_next_set.lock() = Some(message.into());
    }

    /// Install a session without notifying subscribers.
    pub fn seed(&self, user: User, session: Session) {
        *self.inner.current.lock() = Some((user, session));
    }

    /// Notify subscribers as if the change happened outside the app.
    pub fn emit(&self, change: SessionChange) {
        match &change {
            SessionChange::SignedIn { user, session }
            | SessionChange::TokenRefreshed { user, session } => {
                *self.inner.current.lock() = Some((user.clone(), session.clone()));
            },
            SessionChange::SignedOut => *self.inner.current.lock() = None,
        }
        let _ = self.inner.changes.send(change);
    }

    /// The installed session.
    #[must_use]
    pub fn current(&self) -> Option<(User, Session)> {
        self.inner.current.lock().clone()
    }

    /// Number of `set_session` calls.
    #[must_use]
    pub fn set_calls(&self) -> usize {
        self.inner.set_calls.load(Ordering::SeqCst)
    }

    /// Number of `sign_out` calls.
    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.inner.sign_out_calls.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.changes.receiver_count()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn set_session(
        &self,
        tokens: &SessionTokens,
    ) -> impl Future<Output = Result<(User, Session)>> + Send {
        let store = self.clone();
        let tokens = tokens.clone();

        async move {
            store.inner.set_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = store.inner.fail_next_set.lock().take() {
                return Err(AuthError::SessionStore(message));
            }

            let user = store.inner.user.lock().clone();
            let session = Session {
                user_id: user.id.clone(),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                expires_at: None,
            };
            store.emit(SessionChange::SignedIn {
                user: user.clone(),
                session: session.clone(),
            });
            Ok((user, session))
        }
    }

    fn current_session(&self) -> impl Future<Output = Result<Option<(User, Session)>>> + Send {
        let current = self.current();
        async move { Ok(current) }
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.inner.changes.subscribe())
    }

    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send {
        let store = self.clone();
        async move {
            store.inner.sign_out_calls.fetch_add(1, Ordering::SeqCst);
            store.emit(SessionChange::SignedOut);
            Ok(())
        }
    }
}
