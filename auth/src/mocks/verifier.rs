//! Scripted verification backend.

use crate::context::CompanyId;
use crate::error::{AuthError, Result};
use crate::providers::{SessionTokens, VerificationBackend, VerifyResponse};
use crate::state::{Company, ExternalUser};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};

#[derive(Debug)]
struct Inner {
    outcome: Mutex<Result<VerifyResponse>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    panics: AtomicBool,
    calls: Mutex<Vec<CompanyId>>,
}

/// Verification backend returning a scripted outcome.
///
/// A gated verifier holds every call until [`release`](Self::release).
/// Clones share the same script.
#[derive(Debug, Clone)]
pub struct MockVerifier {
    inner: Arc<Inner>,
}

impl MockVerifier {
    fn with_outcome(outcome: Result<VerifyResponse>) -> Self {
        Self {
            inner: Arc::new(Inner {
                outcome: Mutex::new(outcome),
                gate: Mutex::new(None),
                panics: AtomicBool::new(false),
                calls: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The response of a successful verification, session tokens included.
    #[must_use]
    pub fn approved_response() -> VerifyResponse {
        VerifyResponse {
            success: true,
            error: None,
            whop_user: Some(ExternalUser {
                id: "user_w1".to_string(),
                email: "ada@example.com".to_string(),
                name: "Ada".to_string(),
            }),
            company: Some(Company {
                id: "biz_AB12cd".to_string(),
                title: Some("Acme".to_string()),
            }),
            session: Some(SessionTokens {
                access_token: "access-token".to_string(),
                refresh_token: "refresh-token".to_string(),
            }),
        }
    }

    /// Approve every tenant.
    #[must_use]
    pub fn approving() -> Self {
        Self::with_outcome(Ok(Self::approved_response()))
    }

    /// Refuse every tenant with `message`.
    #[must_use]
    pub fn denying(message: impl Into<String>) -> Self {
        Self::with_outcome(Ok(VerifyResponse {
            success: false,
            error: Some(message.into()),
            ..VerifyResponse::default()
        }))
    }

    /// Answer with `response`.
    #[must_use]
    pub fn success(response: VerifyResponse) -> Self {
        Self::with_outcome(Ok(response))
    }

    /// Fail every call with `error`.
    #[must_use]
    pub fn failing(error: AuthError) -> Self {
        Self::with_outcome(Err(error))
    }

    /// Panic inside every call.
    #[must_use]
    pub fn panicking() -> Self {
        let verifier = Self::approving();
        verifier.inner.panics.store(true, Ordering::SeqCst);
        verifier
    }

    /// Hold calls until released.
    #[must_use]
    pub fn gated(self) -> Self {
        *self.inner.gate.lock() = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let one held call proceed.
    pub fn release(&self) {
        if let Some(gate) = self.inner.gate.lock().as_ref() {
            gate.add_permits(1);
        }
    }

    /// Replace the scripted outcome.
    pub fn set_outcome(&self, outcome: Result<VerifyResponse>) {
        *self.inner.outcome.lock() = outcome;
    }

    /// Tenants verified so far.
    #[must_use]
    pub fn calls(&self) -> Vec<CompanyId> {
        self.inner.calls.lock().clone()
    }
}

impl VerificationBackend for MockVerifier {
    #[allow(clippy::panic)]
    fn verify(
        &self,
        company_id: &CompanyId,
    ) -> impl Future<Output = Result<VerifyResponse>> + Send {
        let inner = Arc::clone(&self.inner);
        let company_id = company_id.clone();

        async move {
            inner.calls.lock().push(company_id);

            let gate = inner.gate.lock().clone();
            if let Some(gate) = gate {
                let _ = gate.acquire().await.map(SemaphorePermit::forget);
            }

            if inner.panics.load(Ordering::SeqCst) {
                panic!("verifier exploded");
            }
            inner.outcome.lock().clone()
        }
    }
}
