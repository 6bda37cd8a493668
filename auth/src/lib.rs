//! # Whop Embed Authentication
//!
//! Authentication handshake of an application embedded in a host frame.
//!
//! ## Flow
//!
//! ```text
//! initialize ─▶ resolve tenant ─▶ verify with backend ─▶ install session ─▶ authenticated
//!                 │ host (getTopLevelUrlData)
//!                 └ URL fallback (/dashboard/biz_…, /biz_…, ?companyId=)
//! ```
//!
//! The handshake is a reducer ([`AuthOrchestrator`]) running in a
//! [`Store`](whop_embed_runtime::Store); external systems are injected through
//! [`AuthEnvironment`]:
//!
//! - [`ContextResolver`]: tenant resolution over the host transport
//! - [`VerificationBackend`]: backend verification ([`HttpVerifier`] in production)
//! - [`SessionStore`]: the application's session holder
//!
//! [`EmbeddedAuth`] is the handle the presentation layer uses. Every outcome
//! ends up in the published [`AuthState`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use whop_embed_auth::*;
//!
//! let config = EmbedConfig::from_env()?;
//! let env = AuthEnvironment::new(window, &config, config.http_verifier()?, sessions)?;
//! let auth = EmbeddedAuth::start(env);
//!
//! let mut states = auth.subscribe();
//! if auth.initialize().await {
//!     let state = auth.state().await;
//!     println!("signed in as {:?}", state.user);
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod actions;
pub mod config;
pub mod constants;
pub mod context;
pub mod environment;
pub mod error;
pub mod facade;
pub mod host;
pub mod metrics;
pub mod providers;
pub mod reducers;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use actions::AuthAction;
pub use config::EmbedConfig;
pub use context::{
    CompanyId, ContextResolver, ContextSource, ResolvedContext, TenantRules, TopLevelUrlData,
    ViewType,
};
pub use environment::AuthEnvironment;
pub use error::{AuthError, Result};
pub use facade::{AuthStore, EmbeddedAuth};
pub use host::{ExternalNavigation, open_external_url};
pub use providers::{
    HttpVerifier, SessionChange, SessionStore, SessionSubscription, SessionTokens,
    VerificationBackend, VerifyRequest, VerifyResponse,
};
pub use reducers::AuthOrchestrator;
pub use state::{AuthPhase, AuthState, Company, ExternalUser, Session, User};

/// Register the metric descriptions of this crate and its transport.
pub fn describe_metrics() {
    metrics::describe_metrics();
    whop_embed_transport::describe_metrics();
}
