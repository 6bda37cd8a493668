//! Transport error types.

use std::time::Duration;
use thiserror::Error;

/// Failures of the host frame itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The top-level frame belongs to another origin and cannot be inspected.
    #[error("top-level frame is cross-origin")]
    CrossOrigin,

    /// No window context is available.
    #[error("no window context")]
    NoWindow,

    /// `postMessage` to the parent frame failed.
    #[error("post to parent failed: {0}")]
    PostFailed(String),

    /// Navigation was refused.
    #[error("navigation failed: {0}")]
    Navigation(String),
}

/// Errors surfaced to callers of [`TransportClient`](crate::TransportClient).
///
/// Origin rejections are never surfaced; foreign frames are dropped silently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// There is no parent frame distinct from the current frame.
    #[error("not embedded in a host frame")]
    NotEmbedded,

    /// No matching response arrived in time.
    #[error("request '{event}' timed out after {}ms", timeout.as_millis())]
    Timeout {
        /// Event name of the request
        event: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// The host answered with an `error` field.
    #[error("host rejected request: {0}")]
    Rejected(String),

    /// The client was torn down while the request was pending.
    #[error("transport disposed")]
    Disposed,

    /// The request could not be posted to the parent frame.
    #[error("failed to post message: {0}")]
    PostFailed(String),

    /// A payload could not be encoded or decoded.
    #[error("payload decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotEmbedded => "not_embedded",
            Self::Timeout { .. } => "timeout",
            Self::Rejected(_) => "rejected",
            Self::Disposed => "disposed",
            Self::PostFailed(_) => "post_failed",
            Self::Decode(_) => "decode",
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}
