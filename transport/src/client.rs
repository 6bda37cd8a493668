//! Correlated request/response client for the parent frame.

use crate::config::TransportConfig;
use crate::dispatch::{Route, route};
use crate::envelope::{MessageEnvelope, WILDCARD_ORIGIN};
use crate::error::TransportError;
use crate::metrics::TransportMetrics;
use crate::window::{FrameWindow, MessageEvent, Subscription, subscribe};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Sender half of a pending request.
type PendingTx = oneshot::Sender<Result<Value, TransportError>>;

/// State shared with the window listener.
///
/// The listener holds this, never the client, so dropping the client is
/// enough to release everything.
struct Shared {
    pending: Mutex<HashMap<String, PendingTx>>,
    config: TransportConfig,
}

impl Shared {
    fn handle(&self, event: &MessageEvent) {
        let verdict = route(event, &self.config.origin_policy, |id| {
            self.pending.lock().contains_key(id)
        });

        match verdict {
            Route::OriginRejected => {
                TransportMetrics::record_origin_rejected();
                tracing::debug!(origin = %event.origin, "Dropped message from untrusted origin");
            },
            Route::Foreign => {
                tracing::trace!(origin = %event.origin, "Ignored foreign message");
            },
            Route::Unmatched(id) => {
                tracing::debug!(correlation_id = %id, "Ignored response with no pending request");
            },
            Route::Deliver { id, outcome } => {
                // Removal retires the entry; a concurrent timeout that already
                // removed it wins and this response is dropped.
                let Some(tx) = self.pending.lock().remove(&id) else {
                    tracing::debug!(correlation_id = %id, "Response lost race with timeout");
                    return;
                };
                TransportMetrics::record_response(outcome.is_ok());
                let _ = tx.send(outcome.map_err(TransportError::Rejected));
            },
        }
    }
}

/// Client for typed messaging with the host frame.
///
/// Owns the window message listener and the pending-request table. Every
/// request is retired exactly once: by its response, by its timeout, or by
/// [`teardown`](Self::teardown).
///
/// # Example
///
/// ```ignore
/// let client = TransportClient::new(window, TransportConfig::default());
/// client.initialize();
///
/// let data = client.send("getTopLevelUrlData", json!({})).await?;
/// ```
pub struct TransportClient {
    window: Arc<dyn FrameWindow>,
    shared: Arc<Shared>,
    subscription: Mutex<Option<Subscription>>,
}

impl TransportClient {
    /// Create a client. No listener is registered until [`initialize`](Self::initialize).
    #[must_use]
    pub fn new(window: Arc<dyn FrameWindow>, config: TransportConfig) -> Self {
        Self {
            window,
            shared: Arc::new(Shared {
                pending: Mutex::new(HashMap::new()),
                config,
            }),
            subscription: Mutex::new(None),
        }
    }

    /// The window this client talks through.
    #[must_use]
    pub fn window(&self) -> &Arc<dyn FrameWindow> {
        &self.window
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.shared.config
    }

    /// Register the message listener.
    ///
    /// Idempotent. Returns whether a messaging-capable window exists.
    pub fn initialize(&self) -> bool {
        if !self.window.has_window() {
            tracing::debug!("No window context; transport unavailable");
            return false;
        }

        let mut subscription = self.subscription.lock();
        if subscription.is_none() {
            let shared = Arc::clone(&self.shared);
            *subscription = Some(subscribe(
                Arc::clone(&self.window),
                Arc::new(move |event: &MessageEvent| shared.handle(event)),
            ));
            tracing::debug!("Transport listener registered");
        }
        true
    }

    /// Whether the message listener is registered.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Number of requests awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Send a request with the configured timeout.
    ///
    /// # Errors
    ///
    /// See [`send_with_timeout`](Self::send_with_timeout).
    pub async fn send(&self, event: &str, payload: Value) -> Result<Value, TransportError> {
        self.send_with_timeout(event, payload, self.shared.config.request_timeout)
            .await
    }

    /// Send a request and wait for the matching response.
    ///
    /// # Errors
    ///
    /// - [`TransportError::NotEmbedded`]: no parent frame
    /// - [`TransportError::PostFailed`]: the message could not be posted
    /// - [`TransportError::Timeout`]: no response within `timeout`
    /// - [`TransportError::Rejected`]: the host answered with an error
    /// - [`TransportError::Disposed`]: the client was torn down meanwhile
    #[tracing::instrument(skip(self, payload), fields(correlation_id))]
    pub async fn send_with_timeout(
        &self,
        event: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        if !self.window.has_parent() {
            return Err(TransportError::NotEmbedded);
        }
        if !self.is_initialized() {
            self.initialize();
        }

        let id = Uuid::new_v4().to_string();
        tracing::Span::current().record("correlation_id", id.as_str());
        let message = MessageEnvelope::request(id.as_str(), event, payload).to_value()?;

        let (tx, mut rx) = oneshot::channel();
        self.shared.pending.lock().insert(id.clone(), tx);

        if let Err(error) = self.window.post_to_parent(message, WILDCARD_ORIGIN) {
            self.shared.pending.lock().remove(&id);
            tracing::warn!(%error, "Failed to post request");
            return Err(TransportError::PostFailed(error.to_string()));
        }
        TransportMetrics::record_request(event);
        tracing::debug!("Request posted");

        let waited = tokio::time::timeout(timeout, &mut rx).await;
        let result = match waited {
            Ok(delivered) => delivered.unwrap_or(Err(TransportError::Disposed)),
            Err(_elapsed) => {
                let expired = self.shared.pending.lock().remove(&id).is_some();
                if expired {
                    TransportMetrics::record_timeout(event);
                    tracing::warn!(timeout_ms = timeout.as_millis(), "Request timed out");
                    Err(TransportError::Timeout {
                        event: event.to_string(),
                        timeout,
                    })
                } else {
                    // Retired by a response or teardown as the timer fired.
                    rx.await.unwrap_or(Err(TransportError::Disposed))
                }
            },
        };

        if let Err(error) = &result {
            tracing::debug!(%error, "Request failed");
        }
        result
    }

    /// Typed request: serializes `request` and decodes the response.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), plus [`TransportError::Decode`] when the
    /// request cannot be encoded or the response has the wrong shape.
    pub async fn request<Req, Resp>(&self, event: &str, request: &Req) -> Result<Resp, TransportError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_value(request)?;
        let response = self.send(event, payload).await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Remove the listener and fail every pending request with
    /// [`TransportError::Disposed`].
    ///
    /// Returns the number of requests failed. The client may be initialized
    /// again afterwards.
    pub fn teardown(&self) -> usize {
        let subscription = self.subscription.lock().take();
        if let Some(mut subscription) = subscription {
            subscription.dispose();
        }

        let drained: Vec<PendingTx> = {
            let mut pending = self.shared.pending.lock();
            pending.drain().map(|(_, tx)| tx).collect()
        };
        let count = drained.len();
        for tx in drained {
            let _ = tx.send(Err(TransportError::Disposed));
        }

        TransportMetrics::record_disposed(count);
        tracing::debug!(disposed = count, "Transport torn down");
        count
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("initialized", &self.is_initialized())
            .field("pending", &self.pending_count())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{MockFrameWindow, MockReply};
    use serde::Deserialize;
    use serde_json::json;
    use url::Url;

    const HOST: &str = "https://whop.com";

    fn embedded() -> MockFrameWindow {
        MockFrameWindow::embedded(Url::parse("https://app.example.com/").unwrap())
    }

    fn client(window: &MockFrameWindow) -> TransportClient {
        TransportClient::new(Arc::new(window.clone()), TransportConfig::default())
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let window = embedded();
        let client = client(&window);

        assert!(client.initialize());
        assert!(client.initialize());
        assert!(client.is_initialized());
        assert_eq!(window.listener_count(), 1);
    }

    #[test]
    fn test_initialize_without_window_reports_unavailable() {
        let window = MockFrameWindow::headless(Url::parse("https://app.example.com/").unwrap());
        let client = client(&window);

        assert!(!client.initialize());
        assert_eq!(window.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_send_without_parent_fails_immediately() {
        let window = MockFrameWindow::top_level(Url::parse("https://app.example.com/").unwrap());
        let client = client(&window);

        let result = client.send("getTopLevelUrlData", json!({})).await;
        assert_eq!(result, Err(TransportError::NotEmbedded));
        assert!(window.posted().is_empty());
    }

    #[tokio::test]
    async fn test_send_resolves_with_matching_response() {
        let window = embedded();
        window.respond_with(|request| {
            Some(MockReply::ok(HOST, &request.id, json!({"echo": request.request})))
        });
        let client = client(&window);

        let response = client.send("ping", json!({"n": 1})).await.unwrap();
        assert_eq!(response, json!({"echo": {"n": 1}}));
        assert_eq!(client.pending_count(), 0);

        let posted = window.posted_envelopes();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].event.as_deref(), Some("ping"));
        assert_eq!(window.posted()[0].1, "*");
    }

    #[tokio::test]
    async fn test_error_response_rejects() {
        let window = embedded();
        window.respond_with(|request| Some(MockReply::error(HOST, &request.id, "forbidden")));
        let client = client(&window);

        let result = client.send("ping", json!({})).await;
        assert_eq!(result, Err(TransportError::Rejected("forbidden".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_request_times_out() {
        let window = embedded();
        let client = client(&window);

        let result = client
            .send_with_timeout("ping", json!({}), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(TransportError::Timeout { .. })));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_post_leaves_nothing_pending() {
        let window = embedded();
        window.fail_posts(true);
        let client = client(&window);

        let result = client.send("ping", json!({})).await;
        assert!(matches!(result, Err(TransportError::PostFailed(_))));
        assert_eq!(client.pending_count(), 0);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pong {
        pong: u32,
    }

    #[tokio::test]
    async fn test_typed_request_decodes_response() {
        let window = embedded();
        window.respond_with(|request| Some(MockReply::ok(HOST, &request.id, json!({"pong": 7}))));
        let client = client(&window);

        let pong: Pong = client.request("ping", &json!({})).await.unwrap();
        assert_eq!(pong, Pong { pong: 7 });
    }

    #[tokio::test]
    async fn test_typed_request_reports_shape_mismatch() {
        let window = embedded();
        window.respond_with(|request| Some(MockReply::ok(HOST, &request.id, json!("nope"))));
        let client = client(&window);

        let result: Result<Pong, _> = client.request("ping", &json!({})).await;
        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn test_teardown_allows_reinitialize() {
        let window = embedded();
        let client = client(&window);

        client.initialize();
        assert_eq!(client.teardown(), 0);
        assert!(!client.is_initialized());
        assert_eq!(window.listener_count(), 0);

        assert!(client.initialize());
        assert_eq!(window.listener_count(), 1);
    }
}
