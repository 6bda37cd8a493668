//! In-memory frame window for testing.
//!
//! [`MockFrameWindow`] records posted messages and navigations, keeps a real
//! listener registry, and can answer requests through a scripted responder.

use crate::envelope::MessageEnvelope;
use crate::error::FrameError;
use crate::window::{FrameWindow, ListenerId, MessageEvent, MessageListener, NavigationTarget};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use url::Url;

/// A scripted reply delivered to the window's listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct MockReply {
    /// Origin the reply appears to come from
    pub origin: String,
    /// Raw message payload
    pub data: Value,
}

impl MockReply {
    /// Successful response envelope for `id`.
    #[must_use]
    pub fn ok(origin: &str, id: &str, response: Value) -> Self {
        Self::raw(origin, envelope_value(&MessageEnvelope::response(id, response)))
    }

    /// Error response envelope for `id`.
    #[must_use]
    pub fn error(origin: &str, id: &str, message: &str) -> Self {
        Self::raw(origin, envelope_value(&MessageEnvelope::error(id, message)))
    }

    /// Arbitrary payload.
    #[must_use]
    pub fn raw(origin: &str, data: Value) -> Self {
        Self {
            origin: origin.to_string(),
            data,
        }
    }
}

fn envelope_value(envelope: &MessageEnvelope) -> Value {
    envelope.to_value().unwrap_or(Value::Null)
}

type Responder = Arc<dyn Fn(&MessageEnvelope) -> Option<MockReply> + Send + Sync>;

#[derive(Debug, Clone)]
struct FrameShape {
    has_window: bool,
    has_parent: bool,
    top_level: Result<bool, FrameError>,
}

struct Inner {
    shape: Mutex<FrameShape>,
    location: Mutex<Url>,
    listeners: Mutex<Vec<(ListenerId, MessageListener)>>,
    next_listener: AtomicU64,
    posted: Mutex<Vec<(Value, String)>>,
    navigations: Mutex<Vec<(String, NavigationTarget)>>,
    responder: Mutex<Option<Responder>>,
    fail_posts: AtomicBool,
}

impl Inner {
    fn deliver(&self, event: &MessageEvent) {
        // Listeners run outside the lock; they may re-enter the window.
        let listeners: Vec<MessageListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

/// In-memory [`FrameWindow`].
///
/// Clones share the same window.
#[derive(Clone)]
pub struct MockFrameWindow {
    inner: Arc<Inner>,
}

impl MockFrameWindow {
    fn with_shape(location: Url, shape: FrameShape) -> Self {
        Self {
            inner: Arc::new(Inner {
                shape: Mutex::new(shape),
                location: Mutex::new(location),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                posted: Mutex::new(Vec::new()),
                navigations: Mutex::new(Vec::new()),
                responder: Mutex::new(None),
                fail_posts: AtomicBool::new(false),
            }),
        }
    }

    /// A window nested inside a host frame.
    #[must_use]
    pub fn embedded(location: Url) -> Self {
        Self::with_shape(
            location,
            FrameShape {
                has_window: true,
                has_parent: true,
                top_level: Ok(false),
            },
        )
    }

    /// A top-level window with no parent frame.
    #[must_use]
    pub fn top_level(location: Url) -> Self {
        Self::with_shape(
            location,
            FrameShape {
                has_window: true,
                has_parent: false,
                top_level: Ok(true),
            },
        )
    }

    /// No window context at all (server-side rendering).
    #[must_use]
    pub fn headless(location: Url) -> Self {
        Self::with_shape(
            location,
            FrameShape {
                has_window: false,
                has_parent: false,
                top_level: Err(FrameError::NoWindow),
            },
        )
    }

    /// Make the top frame uninspectable.
    pub fn set_cross_origin_top(&self) {
        self.inner.shape.lock().top_level = Err(FrameError::CrossOrigin);
    }

    /// Pretend to be nested (`top_level` false) while having no reachable parent.
    pub fn detach_parent(&self) {
        self.inner.shape.lock().has_parent = false;
    }

    /// Change the current URL.
    pub fn set_location(&self, location: Url) {
        *self.inner.location.lock() = location;
    }

    /// Make `post_to_parent` fail.
    pub fn fail_posts(&self, fail: bool) {
        self.inner.fail_posts.store(fail, Ordering::SeqCst);
    }

    /// Answer posted request envelopes. Replies are delivered asynchronously
    /// on the current Tokio runtime (synchronously when there is none).
    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&MessageEnvelope) -> Option<MockReply> + Send + Sync + 'static,
    {
        *self.inner.responder.lock() = Some(Arc::new(responder));
    }

    /// Stop answering requests.
    pub fn clear_responder(&self) {
        *self.inner.responder.lock() = None;
    }

    /// Deliver a message to every registered listener, synchronously.
    pub fn deliver(&self, origin: &str, data: Value) {
        self.inner.deliver(&MessageEvent::new(origin, data));
    }

    /// Every `(message, target_origin)` posted to the parent.
    #[must_use]
    pub fn posted(&self) -> Vec<(Value, String)> {
        self.inner.posted.lock().clone()
    }

    /// Posted messages that parse as envelopes.
    #[must_use]
    pub fn posted_envelopes(&self) -> Vec<MessageEnvelope> {
        self.inner
            .posted
            .lock()
            .iter()
            .filter_map(|(message, _)| MessageEnvelope::parse(message))
            .collect()
    }

    /// Every direct navigation.
    #[must_use]
    pub fn navigations(&self) -> Vec<(String, NavigationTarget)> {
        self.inner.navigations.lock().clone()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

impl FrameWindow for MockFrameWindow {
    fn has_window(&self) -> bool {
        self.inner.shape.lock().has_window
    }

    fn has_parent(&self) -> bool {
        self.inner.shape.lock().has_parent
    }

    fn top_level(&self) -> Result<bool, FrameError> {
        self.inner.shape.lock().top_level.clone()
    }

    fn location(&self) -> Url {
        self.inner.location.lock().clone()
    }

    fn post_to_parent(&self, message: Value, target_origin: &str) -> Result<(), FrameError> {
        if self.inner.fail_posts.load(Ordering::SeqCst) {
            return Err(FrameError::PostFailed("parent unreachable".to_string()));
        }

        let reply = {
            let responder = self.inner.responder.lock().clone();
            match (responder, MessageEnvelope::parse(&message)) {
                (Some(responder), Some(envelope)) if envelope.is_request() => responder(&envelope),
                _ => None,
            }
        };
        self.inner
            .posted
            .lock()
            .push((message, target_origin.to_string()));

        if let Some(reply) = reply {
            let inner = Arc::clone(&self.inner);
            let event = MessageEvent::new(reply.origin, reply.data);
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move { inner.deliver(&event) });
                },
                Err(_) => inner.deliver(&event),
            }
        }
        Ok(())
    }

    fn add_message_listener(&self, listener: MessageListener) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::SeqCst));
        self.inner.listeners.lock().push((id, listener));
        id
    }

    fn remove_message_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn navigate(&self, url: &str, target: NavigationTarget) -> Result<(), FrameError> {
        if url.is_empty() {
            return Err(FrameError::Navigation("empty url".to_string()));
        }
        self.inner
            .navigations
            .lock()
            .push((url.to_string(), target));
        Ok(())
    }
}

impl std::fmt::Debug for MockFrameWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFrameWindow")
            .field("shape", &*self.inner.shape.lock())
            .field("location", &self.inner.location.lock().as_str())
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}
