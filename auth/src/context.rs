//! Tenant context resolution.
//!
//! The acting company is taken from the host frame when the app is genuinely
//! embedded, and from the current URL otherwise (or when the host does not
//! answer).
//!
//! # Priority
//!
//! 1. Host: `getTopLevelUrlData` over the transport
//! 2. URL path: `/dashboard/<id>` or `/whop-dashboard/<id>`
//! 3. URL path: bare `/<id>`
//! 4. URL query: `companyId`, then `company_id`
//!
//! URL candidates are accepted only when they follow the tenant convention
//! (`biz_` followed by alphanumerics by default).

use crate::constants::{DEFAULT_TENANT_PREFIX, events};
use crate::error::{AuthError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use url::Url;
use whop_embed_transport::{TransportClient, is_embedded};

/// Mode the host asked the app to render in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    /// Customer-facing app view
    App,
    /// Company admin dashboard (default)
    #[default]
    Admin,
    /// Analytics view
    Analytics,
    /// Editor preview
    Preview,
}

impl ViewType {
    /// Parse a host-provided view name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "app" => Some(Self::App),
            "admin" => Some(Self::Admin),
            "analytics" => Some(Self::Analytics),
            "preview" => Some(Self::Preview),
            _ => None,
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Admin => "admin",
            Self::Analytics => "analytics",
            Self::Preview => "preview",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tenant (company) identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(String);

impl CompanyId {
    /// Wrap an identifier without validation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    /// Answered by the host frame
    Host,
    /// Parsed from the current URL
    Url,
}

/// Acting tenant and view for one initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    /// Acting company
    pub company_id: CompanyId,
    /// Experience id (empty when parsed from the URL)
    pub experience_id: String,
    /// Requested view
    pub view_type: ViewType,
    /// Where the context came from
    pub source: ContextSource,
}

/// Host answer to `getTopLevelUrlData`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopLevelUrlData {
    /// Company route, i.e. the company id
    pub company_route: String,
    /// Experience route
    pub experience_route: String,
    /// Experience id
    pub experience_id: String,
    /// View name; unknown or absent means admin
    pub view_type: Option<String>,
    /// Base href of the top-level page
    pub base_href: String,
    /// Full href of the top-level page
    pub full_href: String,
}

impl TopLevelUrlData {
    /// Map into a context. An empty company route yields `None`.
    #[must_use]
    pub fn into_context(self) -> Option<ResolvedContext> {
        let company_route = self.company_route.trim();
        if company_route.is_empty() {
            return None;
        }
        Some(ResolvedContext {
            company_id: CompanyId::new(company_route),
            experience_id: self.experience_id,
            view_type: self
                .view_type
                .as_deref()
                .and_then(ViewType::parse)
                .unwrap_or_default(),
            source: ContextSource::Host,
        })
    }
}

/// Tenant id convention and the URL patterns derived from it.
#[derive(Debug, Clone)]
pub struct TenantRules {
    prefix: String,
    id: Regex,
    dashboard_path: Regex,
    direct_path: Regex,
    platform_route: Regex,
}

impl TenantRules {
    /// Compile the rules for `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the prefix is empty or the patterns
    /// cannot be compiled.
    pub fn new(prefix: &str) -> Result<Self> {
        if prefix.is_empty() {
            return Err(AuthError::Config("tenant prefix cannot be empty".to_string()));
        }
        let id = format!("{}[A-Za-z0-9]+", regex::escape(prefix));
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| AuthError::Config(format!("tenant pattern: {e}")))
        };

        Ok(Self {
            prefix: prefix.to_string(),
            id: compile(format!("^{id}$"))?,
            dashboard_path: compile(format!("/(?:dashboard|whop-dashboard)/({id})(?:/|$)"))?,
            direct_path: compile(format!("^/({id})(?:/|$)"))?,
            platform_route: compile(format!("^/dashboard/{id}(?:/|$)"))?,
        })
    }

    /// Rules for the default `biz_` prefix.
    ///
    /// # Errors
    ///
    /// See [`TenantRules::new`].
    pub fn platform_default() -> Result<Self> {
        Self::new(DEFAULT_TENANT_PREFIX)
    }

    /// The required prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `candidate` is a well-formed tenant id.
    #[must_use]
    pub fn is_valid_id(&self, candidate: &str) -> bool {
        self.id.is_match(candidate)
    }

    /// Extract a tenant id from a URL.
    #[must_use]
    pub fn company_id_from_url(&self, url: &Url) -> Option<CompanyId> {
        let path = url.path();

        let from_path = self
            .dashboard_path
            .captures(path)
            .or_else(|| self.direct_path.captures(path))
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string());
        if let Some(id) = from_path {
            return Some(CompanyId::new(id));
        }

        ["companyId", "company_id"].iter().find_map(|key| {
            url.query_pairs()
                .find(|(name, value)| &**name == *key && self.is_valid_id(value))
                .map(|(_, value)| CompanyId::new(value.into_owned()))
        })
    }

    /// Whether the URL is a platform dashboard route (`/dashboard/<id>`).
    #[must_use]
    pub fn is_platform_route(&self, url: &Url) -> bool {
        self.platform_route.is_match(url.path())
    }

    /// Context derived from the URL alone.
    #[must_use]
    pub fn context_from_url(&self, url: &Url) -> Option<ResolvedContext> {
        self.company_id_from_url(url).map(|company_id| ResolvedContext {
            company_id,
            experience_id: String::new(),
            view_type: ViewType::Admin,
            source: ContextSource::Url,
        })
    }
}

/// Resolves the acting tenant for an initialization attempt.
#[derive(Debug)]
pub struct ContextResolver {
    transport: Arc<TransportClient>,
    rules: TenantRules,
}

impl ContextResolver {
    /// Create a resolver.
    #[must_use]
    pub const fn new(transport: Arc<TransportClient>, rules: TenantRules) -> Self {
        Self { transport, rules }
    }

    /// The transport used to reach the host.
    #[must_use]
    pub const fn transport(&self) -> &Arc<TransportClient> {
        &self.transport
    }

    /// The tenant rules.
    #[must_use]
    pub const fn rules(&self) -> &TenantRules {
        &self.rules
    }

    /// Whether the app runs inside a host frame.
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        is_embedded(self.transport.window().as_ref())
    }

    /// The current document URL.
    #[must_use]
    pub fn location(&self) -> Url {
        self.transport.window().location()
    }

    /// Resolve the context, host first, URL second.
    ///
    /// Returns `None` when no tenant can be determined; that is terminal for
    /// the attempt.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self) -> Option<ResolvedContext> {
        self.transport.initialize();

        if self.is_embedded() {
            match self
                .transport
                .request::<_, TopLevelUrlData>(
                    events::GET_TOP_LEVEL_URL_DATA,
                    &serde_json::json!({}),
                )
                .await
            {
                Ok(data) => {
                    if let Some(context) = data.into_context() {
                        tracing::debug!(company_id = %context.company_id, "Context resolved by host");
                        return Some(context);
                    }
                    tracing::warn!("Host returned no company route, falling back to URL");
                },
                Err(error) => {
                    tracing::warn!(%error, "Host context unavailable, falling back to URL");
                },
            }
        } else {
            tracing::debug!("Not embedded, using URL fallback");
        }

        let context = self.rules.context_from_url(&self.location());
        match &context {
            Some(context) => {
                tracing::debug!(company_id = %context.company_id, "Context resolved from URL");
            },
            None => tracing::warn!("No company id found"),
        }
        context
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rules() -> TenantRules {
        TenantRules::platform_default().unwrap()
    }

    fn id_of(url: &str) -> Option<String> {
        rules()
            .company_id_from_url(&Url::parse(url).unwrap())
            .map(|id| id.as_str().to_string())
    }

    #[test]
    fn test_dashboard_paths() {
        assert_eq!(id_of("https://app.example.com/dashboard/biz_AB12cd"), Some("biz_AB12cd".into()));
        assert_eq!(
            id_of("https://app.example.com/whop-dashboard/biz_XY9/settings"),
            Some("biz_XY9".into())
        );
        assert_eq!(
            id_of("https://app.example.com/embed/dashboard/biz_Nested1"),
            Some("biz_Nested1".into())
        );
    }

    #[test]
    fn test_direct_path() {
        assert_eq!(id_of("https://app.example.com/biz_Direct7"), Some("biz_Direct7".into()));
        assert_eq!(id_of("https://app.example.com/biz_Direct7/designer"), Some("biz_Direct7".into()));
        assert_eq!(id_of("https://app.example.com/designer/biz_Direct7"), None);
    }

    #[test]
    fn test_query_parameters() {
        assert_eq!(id_of("https://app.example.com/foo?company_id=biz_XY9"), Some("biz_XY9".into()));
        assert_eq!(id_of("https://app.example.com/foo?companyId=biz_Q1"), Some("biz_Q1".into()));
        assert_eq!(id_of("https://app.example.com/foo?company_id=not_a_biz_id"), None);
        assert_eq!(
            id_of("https://app.example.com/foo?companyId=nope&company_id=biz_Ok2"),
            Some("biz_Ok2".into())
        );
    }

    #[test]
    fn test_path_wins_over_query() {
        assert_eq!(
            id_of("https://app.example.com/dashboard/biz_Path1?companyId=biz_Query1"),
            Some("biz_Path1".into())
        );
    }

    #[test]
    fn test_malformed_ids_rejected() {
        assert_eq!(id_of("https://app.example.com/dashboard/biz_"), None);
        assert_eq!(id_of("https://app.example.com/dashboard/biz_ab-cd"), None);
        assert_eq!(id_of("https://app.example.com/dashboard/company_1"), None);
        assert_eq!(id_of("https://app.example.com/"), None);
    }

    #[test]
    fn test_custom_prefix_is_escaped() {
        let rules = TenantRules::new("org.").unwrap();
        assert!(rules.is_valid_id("org.abc"));
        assert!(!rules.is_valid_id("orgXabc"));
        assert!(TenantRules::new("").is_err());
    }

    #[test]
    fn test_platform_route() {
        let rules = rules();
        assert!(rules.is_platform_route(&Url::parse("https://a.io/dashboard/biz_1/x").unwrap()));
        assert!(!rules.is_platform_route(&Url::parse("https://a.io/whop-dashboard/biz_1").unwrap()));
        assert!(!rules.is_platform_route(&Url::parse("https://a.io/designer").unwrap()));
    }

    #[test]
    fn test_partial_segment_is_neither_tenant_nor_platform_route() {
        let rules = rules();
        let url = Url::parse("https://a.io/dashboard/biz_AB12cd-x").unwrap();
        assert_eq!(rules.company_id_from_url(&url), None);
        assert!(!rules.is_platform_route(&url));

        let url = Url::parse("https://a.io/dashboard/biz_AB12cd/settings").unwrap();
        assert_eq!(rules.company_id_from_url(&url), Some(CompanyId::new("biz_AB12cd")));
        assert!(rules.is_platform_route(&url));
    }

    #[test]
    fn test_url_context_defaults() {
        let context = rules()
            .context_from_url(&Url::parse("https://a.io/dashboard/biz_AB12cd").unwrap())
            .unwrap();
        assert_eq!(context.experience_id, "");
        assert_eq!(context.view_type, ViewType::Admin);
        assert_eq!(context.source, ContextSource::Url);
    }

    #[test]
    fn test_host_data_mapping() {
        let data: TopLevelUrlData = serde_json::from_value(serde_json::json!({
            "companyRoute": "biz_Host1",
            "experienceRoute": "exp",
            "experienceId": "exp_1",
            "viewType": "analytics",
            "baseHref": "https://whop.com",
            "fullHref": "https://whop.com/dashboard/biz_Host1"
        }))
        .unwrap();
        let context = data.into_context().unwrap();
        assert_eq!(context.company_id.as_str(), "biz_Host1");
        assert_eq!(context.experience_id, "exp_1");
        assert_eq!(context.view_type, ViewType::Analytics);
        assert_eq!(context.source, ContextSource::Host);
    }

    #[test]
    fn test_host_data_defaults() {
        let data: TopLevelUrlData =
            serde_json::from_value(serde_json::json!({"companyRoute": "biz_1", "viewType": "kiosk"}))
                .unwrap();
        assert_eq!(data.into_context().unwrap().view_type, ViewType::Admin);

        let empty: TopLevelUrlData = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(empty.into_context().is_none());
    }

    #[test]
    fn test_view_type_round_trip_names() {
        for view in [ViewType::App, ViewType::Admin, ViewType::Analytics, ViewType::Preview] {
            assert_eq!(ViewType::parse(view.as_str()), Some(view));
        }
        assert_eq!(ViewType::default(), ViewType::Admin);
    }
}
