//! Host-mediated navigation.

use crate::constants::events;
use crate::error::{AuthError, Result};
use serde::Serialize;
use whop_embed_transport::{NavigationTarget, TransportClient, is_embedded};

/// How an external URL was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalNavigation {
    /// The host frame opened it
    Host,
    /// The window navigated itself
    Direct,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenExternalUrl<'a> {
    url: &'a str,
    new_tab: bool,
}

/// Open `url` outside the embedded frame.
///
/// When embedded the host is asked first; if it cannot be reached, or the app
/// is not embedded, the window navigates directly.
///
/// # Errors
///
/// Returns [`AuthError::Internal`] if the direct navigation is refused.
#[tracing::instrument(skip(transport))]
pub async fn open_external_url(
    transport: &TransportClient,
    url: &str,
    new_tab: bool,
) -> Result<ExternalNavigation> {
    let window = transport.window();

    if is_embedded(window.as_ref()) {
        let payload = serde_json::to_value(OpenExternalUrl { url, new_tab })
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        match transport.send(events::OPEN_EXTERNAL_URL, payload).await {
            Ok(_) => return Ok(ExternalNavigation::Host),
            Err(error) => {
                tracing::warn!(%error, "Host could not open URL, navigating directly");
            },
        }
    }

    let target = if new_tab {
        NavigationTarget::NewTab
    } else {
        NavigationTarget::SameTab
    };
    window
        .navigate(url, target)
        .map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok(ExternalNavigation::Direct)
}
