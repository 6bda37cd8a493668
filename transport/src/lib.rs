//! # Whop Embed Transport
//!
//! Correlated request/response messaging between an embedded application and
//! the host frame that embeds it.
//!
//! ## Overview
//!
//! - [`FrameWindow`]: the browser window as an injected dependency
//! - [`MessageEnvelope`]: the `typed-transport` wire format
//! - [`route`]: pure routing of one inbound message (origin, tag, id lookup)
//! - [`TransportClient`]: pending-request table with timeouts and teardown
//!
//! ## Example
//!
//! ```ignore
//! use whop_embed_transport::{TransportClient, TransportConfig};
//!
//! let client = TransportClient::new(window, TransportConfig::default());
//! client.initialize();
//!
//! match client.send("getTopLevelUrlData", json!({})).await {
//!     Ok(data) => { /* use host context */ },
//!     Err(TransportError::NotEmbedded | TransportError::Timeout { .. }) => { /* fall back */ },
//!     Err(error) => return Err(error.into()),
//! }
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod window;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use client::TransportClient;
pub use config::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_TRUSTED_DOMAIN, OriginPolicy, TransportConfig};
pub use dispatch::{Route, route};
pub use envelope::{MessageEnvelope, PROTOCOL_SOURCE};
pub use error::{FrameError, TransportError};
pub use metrics::describe_metrics;
pub use window::{
    FrameWindow, ListenerId, MessageEvent, MessageListener, NavigationTarget, Subscription,
    is_embedded, subscribe,
};
