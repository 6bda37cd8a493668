//! HTTP verification backend.

use crate::context::CompanyId;
use crate::error::{AuthError, Result};
use crate::providers::{VerificationBackend, VerifyRequest, VerifyResponse};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Verification backend reached over HTTP.
///
/// Sends `POST {endpoint}` with `{"companyId": ...}`. When an API key is
/// configured it is sent both as a bearer token and as an `apikey` header.
#[derive(Clone)]
pub struct HttpVerifier {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpVerifier {
    /// Create a verifier.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the HTTP client cannot be built.
    pub fn new(endpoint: Url, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// The verification endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl std::fmt::Debug for HttpVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpVerifier")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

impl VerificationBackend for HttpVerifier {
    fn verify(
        &self,
        company_id: &CompanyId,
    ) -> impl Future<Output = Result<VerifyResponse>> + Send {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", "application/json")
            .json(&VerifyRequest {
                company_id: company_id.clone(),
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key).header("apikey", key);
        }
        let company_id = company_id.clone();

        async move {
            tracing::debug!(%company_id, "Verifying company with backend");

            let response = request
                .send()
                .await
                .map_err(|e| AuthError::BackendUnavailable(e.to_string()))?;
            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| AuthError::BackendUnavailable(e.to_string()))?;
            let parsed = serde_json::from_slice::<VerifyResponse>(&body);

            match (status, parsed) {
                (StatusCode::OK, Ok(verified)) => Ok(verified),
                (status, Ok(refused)) => {
                    // A refusal payload on an error status still carries the reason.
                    tracing::warn!(status = status.as_u16(), "Backend refused verification");
                    Ok(VerifyResponse {
                        success: refused.success && status.is_success(),
                        ..refused
                    })
                },
                (StatusCode::OK, Err(e)) => Err(AuthError::BackendUnavailable(format!(
                    "invalid verification response: {e}"
                ))),
                (status, Err(_)) => Err(AuthError::BackendUnavailable(format!(
                    "verification endpoint returned {}",
                    status.as_u16()
                ))),
            }
        }
    }
}
