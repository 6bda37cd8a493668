//! Transport configuration.

use std::time::Duration;
use url::Url;

/// Host domain trusted by default.
pub const DEFAULT_TRUSTED_DOMAIN: &str = "whop.com";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Which sender origins may deliver responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    /// The origin's host is the domain or one of its subdomains.
    DomainSuffix(String),
    /// The origin merely contains the domain anywhere in its text.
    Substring(String),
}

impl OriginPolicy {
    /// Whether a message from `origin` may be processed.
    #[must_use]
    pub fn allows(&self, origin: &str) -> bool {
        match self {
            Self::DomainSuffix(domain) => {
                let domain = domain.trim_start_matches('.').to_ascii_lowercase();
                if domain.is_empty() {
                    return false;
                }
                let Ok(url) = Url::parse(origin) else {
                    return false;
                };
                url.host_str().is_some_and(|host| {
                    host == domain
                        || host
                            .strip_suffix(domain.as_str())
                            .is_some_and(|rest| rest.ends_with('.'))
                })
            },
            Self::Substring(domain) => !domain.is_empty() && origin.contains(domain.as_str()),
        }
    }

    /// The trusted domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        match self {
            Self::DomainSuffix(domain) | Self::Substring(domain) => domain,
        }
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self::DomainSuffix(DEFAULT_TRUSTED_DOMAIN.to_string())
    }
}

/// Configuration for [`TransportClient`](crate::TransportClient).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use whop_embed_transport::{OriginPolicy, TransportConfig};
///
/// let config = TransportConfig::default()
///     .with_origin_policy(OriginPolicy::Substring("whop.com".to_string()))
///     .with_request_timeout(Duration::from_secs(2));
/// assert_eq!(config.request_timeout, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Origin check for inbound messages
    pub origin_policy: OriginPolicy,
    /// Timeout used by [`send`](crate::TransportClient::send)
    pub request_timeout: Duration,
}

impl TransportConfig {
    /// Set the origin policy
    #[must_use]
    pub fn with_origin_policy(mut self, policy: OriginPolicy) -> Self {
        self.origin_policy = policy;
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            origin_policy: OriginPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_suffix_accepts_domain_and_subdomains() {
        let policy = OriginPolicy::default();
        assert!(policy.allows("https://whop.com"));
        assert!(policy.allows("https://dash.whop.com"));
        assert!(policy.allows("https://WHOP.com"));
    }

    #[test]
    fn test_domain_suffix_rejects_lookalikes() {
        let policy = OriginPolicy::default();
        assert!(!policy.allows("https://evilwhop.com"));
        assert!(!policy.allows("https://whop.com.evil.io"));
        assert!(!policy.allows("null"));
        assert!(!policy.allows(""));
    }

    #[test]
    fn test_substring_accepts_any_containing_origin() {
        let policy = OriginPolicy::Substring("whop.com".to_string());
        assert!(policy.allows("https://whop.com"));
        assert!(policy.allows("https://whop.com.evil.io"));
        assert!(!policy.allows("https://example.com"));
    }

    #[test]
    fn test_empty_domain_trusts_nothing() {
        assert!(!OriginPolicy::DomainSuffix(String::new()).allows("https://whop.com"));
        assert!(!OriginPolicy::Substring(String::new()).allows("https://whop.com"));
    }

    #[test]
    fn test_default_timeout_is_five_seconds() {
        assert_eq!(TransportConfig::default().request_timeout, Duration::from_millis(5000));
    }
}
