//! Inbound message routing.
//!
//! [`route`] decides what happens to one window message given the origin
//! policy and the pending table. It has no side effects; the client applies
//! the verdict.

use crate::config::OriginPolicy;
use crate::envelope::MessageEnvelope;
use crate::window::MessageEvent;
use serde_json::Value;

/// Verdict for one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Sender origin is not trusted; drop silently.
    OriginRejected,
    /// Not a response envelope of this protocol.
    Foreign,
    /// Well-formed response with no pending request (late or duplicate).
    Unmatched(String),
    /// Retire the pending request `id` with `outcome`.
    Deliver {
        /// Correlation id
        id: String,
        /// Response payload or host error message
        outcome: Result<Value, String>,
    },
}

/// Route an inbound message.
///
/// The origin is checked first, so an untrusted sender never reaches a
/// pending request even with a matching id.
pub fn route(
    event: &MessageEvent,
    policy: &OriginPolicy,
    is_pending: impl Fn(&str) -> bool,
) -> Route {
    if !policy.allows(&event.origin) {
        return Route::OriginRejected;
    }

    let Some(envelope) = MessageEnvelope::parse(&event.data) else {
        return Route::Foreign;
    };

    let id = envelope.id.clone();
    let Some(outcome) = envelope.into_outcome() else {
        return Route::Foreign;
    };

    if is_pending(&id) {
        Route::Deliver { id, outcome }
    } else {
        Route::Unmatched(id)
    }
}
