//! Host frame abstraction.
//!
//! The browser window is an external collaborator. Everything the transport
//! and the context resolver need from it is expressed by [`FrameWindow`], so
//! the messaging logic runs the same against a real frame binding or the
//! in-memory [`MockFrameWindow`](crate::mocks::MockFrameWindow).

use crate::error::FrameError;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// A message received by the current window.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Origin of the sending frame, e.g. `https://whop.com`
    pub origin: String,
    /// Structured-clone payload
    pub data: Value,
}

impl MessageEvent {
    /// Create a message event.
    #[must_use]
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

/// Callback invoked for every message the window receives.
pub type MessageListener = Arc<dyn Fn(&MessageEvent) + Send + Sync>;

/// Identifier of a registered message listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Where a direct navigation opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTarget {
    /// Replace the current document
    SameTab,
    /// Open a new browsing context
    NewTab,
}

impl NavigationTarget {
    /// Browser target name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SameTab => "_self",
            Self::NewTab => "_blank",
        }
    }
}

/// The window the embedded application runs in.
pub trait FrameWindow: Send + Sync {
    /// Whether a messaging-capable window context exists.
    fn has_window(&self) -> bool;

    /// Whether a parent frame distinct from the current frame exists.
    fn has_parent(&self) -> bool;

    /// Whether this frame is the top-level frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::CrossOrigin`] when the top frame cannot be inspected.
    fn top_level(&self) -> Result<bool, FrameError>;

    /// The current document URL.
    fn location(&self) -> Url;

    /// Post a message to the parent frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PostFailed`] if the message cannot be delivered.
    fn post_to_parent(&self, message: Value, target_origin: &str) -> Result<(), FrameError>;

    /// Register a window-level message listener.
    fn add_message_listener(&self, listener: MessageListener) -> ListenerId;

    /// Remove a listener. Returns `false` if it was not registered.
    fn remove_message_listener(&self, id: ListenerId) -> bool;

    /// Navigate directly, bypassing the host.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Navigation`] if the navigation is refused.
    fn navigate(&self, url: &str, target: NavigationTarget) -> Result<(), FrameError>;
}

/// Whether the current frame is genuinely nested inside another frame.
///
/// A cross-origin top frame cannot be inspected, which only happens when
/// nested, so it counts as embedded.
#[must_use]
pub fn is_embedded(window: &dyn FrameWindow) -> bool {
    if !window.has_window() {
        return false;
    }
    match window.top_level() {
        Ok(top) => !top,
        Err(FrameError::CrossOrigin) => true,
        Err(_) => false,
    }
}

/// Registers `listener` and returns the disposer that removes it.
#[must_use]
pub fn subscribe(window: Arc<dyn FrameWindow>, listener: MessageListener) -> Subscription {
    let id = window.add_message_listener(listener);
    tracing::trace!(listener_id = id.0, "Message listener registered");
    Subscription {
        window,
        id: Some(id),
    }
}

/// Ownership of one registered message listener.
///
/// The listener is removed exactly once, by [`dispose`](Self::dispose) or on drop.
pub struct Subscription {
    window: Arc<dyn FrameWindow>,
    id: Option<ListenerId>,
}

impl Subscription {
    /// Remove the listener. Returns `false` if it was already removed.
    pub fn dispose(&mut self) -> bool {
        match self.id.take() {
            Some(id) => {
                tracing::trace!(listener_id = id.0, "Message listener removed");
                self.window.remove_message_listener(id)
            },
            None => false,
        }
    }

    /// Whether the listener is still registered through this handle.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.id.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockFrameWindow;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_top_level_window_is_not_embedded() {
        let window = MockFrameWindow::top_level(url("https://app.example.com/"));
        assert!(!is_embedded(&window));
    }

    #[test]
    fn test_nested_window_is_embedded() {
        let window = MockFrameWindow::embedded(url("https://app.example.com/"));
        assert!(is_embedded(&window));
    }

    #[test]
    fn test_cross_origin_top_counts_as_embedded() {
        let window = MockFrameWindow::embedded(url("https://app.example.com/"));
        window.set_cross_origin_top();
        assert!(is_embedded(&window));
    }

    #[test]
    fn test_headless_is_not_embedded() {
        let window = MockFrameWindow::headless(url("https://app.example.com/"));
        assert!(!is_embedded(&window));
    }

    #[test]
    fn test_subscription_removes_listener_once() {
        let window = MockFrameWindow::embedded(url("https://app.example.com/"));
        let mut subscription = subscribe(Arc::new(window.clone()), Arc::new(|_: &MessageEvent| {}));
        assert_eq!(window.listener_count(), 1);
        assert!(subscription.is_active());

        assert!(subscription.dispose());
        assert!(!subscription.dispose());
        assert_eq!(window.listener_count(), 0);
    }

    #[test]
    fn test_dropping_subscription_removes_listener() {
        let window = MockFrameWindow::embedded(url("https://app.example.com/"));
        {
            let _subscription = subscribe(Arc::new(window.clone()), Arc::new(|_: &MessageEvent| {}));
            assert_eq!(window.listener_count(), 1);
        }
        assert_eq!(window.listener_count(), 0);
    }
}
