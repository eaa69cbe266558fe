use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::app::Result;

/// Hosts that only redirect to the real place page.
const SHORT_LINK_HOSTS: &[&str] = &["maps.app.goo.gl", "goo.gl", "g.co"];

pub fn is_short_link(locator: &str) -> bool {
    Url::parse(locator.trim())
        .ok()
        .and_then(|url| url.host_str().map(|h| SHORT_LINK_HOSTS.contains(&h)))
        .unwrap_or(false)
}

/// Follow redirects of a short link and return the final URL.
pub async fn resolve_short_link(locator: &str, timeout: Duration, user_agent: Option<&str>) -> Result<String> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    let client = builder.build()?;
    let response = client.get(locator.trim()).send().await?;
    Ok(response.url().to_string())
}

/// Expand `locator` when it is a short link, keeping it unchanged when it is
/// not or when resolution fails.
pub async fn expand_locator(locator: &str, timeout: Duration, user_agent: Option<&str>) -> String {
    if !is_short_link(locator) {
        return locator.to_string();
    }
    match resolve_short_link(locator, timeout, user_agent).await {
        Ok(resolved) => {
            debug!("Resolved {} to {}", locator, resolved);
            resolved
        }
        Err(e) => {
            warn!("Could not resolve short link {}: {}", locator, e);
            locator.to_string()
        }
    }
}
