//! Embedding configuration.
//!
//! Values are supplied by the application. [`EmbedConfig::from_env`] reads the
//! `WHOP_EMBED_*` variables on top of the defaults:
//!
//! | Variable | Field |
//! |---|---|
//! | `WHOP_EMBED_TRUSTED_DOMAIN` | `transport.origin_policy` (domain suffix) |
//! | `WHOP_EMBED_REQUEST_TIMEOUT_MS` | `transport.request_timeout` |
//! | `WHOP_EMBED_TENANT_PREFIX` | `tenant_prefix` |
//! | `WHOP_EMBED_VERIFY_URL` | `verify_url` |
//! | `WHOP_EMBED_API_KEY` | `api_key` |
//! | `WHOP_EMBED_VERIFY_TIMEOUT_MS` | `verify_timeout` |

use crate::constants::{DEFAULT_TENANT_PREFIX, DEFAULT_VERIFY_TIMEOUT};
use crate::context::TenantRules;
use crate::error::{AuthError, Result};
use crate::providers::HttpVerifier;
use std::fmt;
use std::time::Duration;
use url::Url;
use whop_embed_transport::{OriginPolicy, TransportConfig};

/// Environment variable names.
pub mod env_vars {
    /// Trusted host domain.
    pub const TRUSTED_DOMAIN: &str = "WHOP_EMBED_TRUSTED_DOMAIN";
    /// Transport request timeout in milliseconds.
    pub const REQUEST_TIMEOUT_MS: &str = "WHOP_EMBED_REQUEST_TIMEOUT_MS";
    /// Required tenant id prefix.
    pub const TENANT_PREFIX: &str = "WHOP_EMBED_TENANT_PREFIX";
    /// Verification endpoint.
    pub const VERIFY_URL: &str = "WHOP_EMBED_VERIFY_URL";
    /// Verification API key.
    pub const API_KEY: &str = "WHOP_EMBED_API_KEY";
    /// Verification timeout in milliseconds.
    pub const VERIFY_TIMEOUT_MS: &str = "WHOP_EMBED_VERIFY_TIMEOUT_MS";
}

/// Configuration of the embedded authentication handshake.
///
/// `Debug` redacts the API key.
#[derive(Clone, PartialEq, Eq)]
pub struct EmbedConfig {
    /// Host transport settings
    pub transport: TransportConfig,
    /// Required prefix of tenant ids
    pub tenant_prefix: String,
    /// Verification endpoint, required by [`http_verifier`](Self::http_verifier)
    pub verify_url: Option<Url>,
    /// API key sent to the verification endpoint
    pub api_key: Option<String>,
    /// Timeout of the verification call
    pub verify_timeout: Duration,
}

impl EmbedConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if a variable is malformed or the result
    /// is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, starting from the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if a value is malformed or the result is
    /// invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(domain) = lookup(env_vars::TRUSTED_DOMAIN) {
            config.transport.origin_policy = OriginPolicy::DomainSuffix(domain);
        }
        if let Some(value) = lookup(env_vars::REQUEST_TIMEOUT_MS) {
            config.transport.request_timeout = parse_millis(env_vars::REQUEST_TIMEOUT_MS, &value)?;
        }
        if let Some(prefix) = lookup(env_vars::TENANT_PREFIX) {
            config.tenant_prefix = prefix;
        }
        if let Some(value) = lookup(env_vars::VERIFY_URL) {
            let url = Url::parse(&value).map_err(|e| {
                AuthError::Config(format!("{}: {e}", env_vars::VERIFY_URL))
            })?;
            config.verify_url = Some(url);
        }
        if let Some(key) = lookup(env_vars::API_KEY).filter(|key| !key.is_empty()) {
            config.api_key = Some(key);
        }
        if let Some(value) = lookup(env_vars::VERIFY_TIMEOUT_MS) {
            config.verify_timeout = parse_millis(env_vars::VERIFY_TIMEOUT_MS, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the transport configuration
    #[must_use]
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Set the tenant id prefix
    #[must_use]
    pub fn with_tenant_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tenant_prefix = prefix.into();
        self
    }

    /// Set the verification endpoint
    #[must_use]
    pub fn with_verify_url(mut self, url: Url) -> Self {
        self.verify_url = Some(url);
        self
    }

    /// Set the verification API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the verification timeout
    #[must_use]
    pub const fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.transport.origin_policy.domain().trim_start_matches('.').is_empty() {
            return Err(AuthError::Config("trusted domain cannot be empty".to_string()));
        }
        if self.transport.request_timeout.is_zero() {
            return Err(AuthError::Config("request_timeout must be > 0".to_string()));
        }
        if self.tenant_prefix.is_empty() {
            return Err(AuthError::Config("tenant_prefix cannot be empty".to_string()));
        }
        if self.verify_timeout.is_zero() {
            return Err(AuthError::Config("verify_timeout must be > 0".to_string()));
        }
        if let Some(url) = self
            .verify_url
            .as_ref()
            .filter(|url| !matches!(url.scheme(), "http" | "https"))
        {
            return Err(AuthError::Config(format!(
                "verify_url must be http(s), got {}",
                url.scheme()
            )));
        }
        Ok(())
    }

    /// Compile the tenant rules for the configured prefix.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the prefix cannot be compiled.
    pub fn tenant_rules(&self) -> Result<TenantRules> {
        TenantRules::new(&self.tenant_prefix)
    }

    /// Build the HTTP verification backend.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if no endpoint is configured or the HTTP
    /// client cannot be built.
    pub fn http_verifier(&self) -> Result<HttpVerifier> {
        let endpoint = self
            .verify_url
            .clone()
            .ok_or_else(|| AuthError::Config("verify_url is not set".to_string()))?;
        HttpVerifier::new(endpoint, self.api_key.clone(), self.verify_timeout)
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            tenant_prefix: DEFAULT_TENANT_PREFIX.to_string(),
            verify_url: None,
            api_key: None,
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }
}

impl fmt::Debug for EmbedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbedConfig")
            .field("transport", &self.transport)
            .field("tenant_prefix", &self.tenant_prefix)
            .field("verify_url", &self.verify_url.as_ref().map(Url::as_str))
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("verify_timeout", &self.verify_timeout)
            .finish()
    }
}

fn parse_millis(name: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| AuthError::Config(format!("{name}: {e}")))
}
