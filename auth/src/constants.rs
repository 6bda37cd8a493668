//! Authentication constants.
//!
//! Event names of the host protocol and the user-facing messages published
//! in `AuthState::error`.

use std::time::Duration;

/// Host protocol event names.
pub mod events {
    /// Ask the host for the top-level URL data (tenant route, experience, view).
    pub const GET_TOP_LEVEL_URL_DATA: &str = "getTopLevelUrlData";

    /// Ask the host to open a URL outside the frame.
    pub const OPEN_EXTERNAL_URL: &str = "openExternalUrl";
}

/// Messages shown to the user.
pub mod messages {
    /// No tenant could be resolved from the host or the URL.
    pub const TENANT_UNRESOLVED: &str =
        "Could not determine company. Please access from WHOP Dashboard.";

    /// Generic verification failure.
    pub const AUTHENTICATION_FAILED: &str = "Authentication failed";

    /// Verification succeeded but no session could be installed.
    pub const SESSION_ESTABLISH_FAILED: &str = "Failed to establish session";
}

/// Required prefix of tenant (company) identifiers.
pub const DEFAULT_TENANT_PREFIX: &str = "biz_";

/// Default timeout of the backend verification call.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(15);
