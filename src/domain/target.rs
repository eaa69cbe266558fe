use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::Result;

/// What a harvesting run points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Free-text search term submitted to the search entry point.
    Keyword(String),
    /// Direct link to the place page.
    Locator(String),
}

impl Target {
    pub fn kind(&self) -> &'static str {
        match self {
            Target::Keyword(_) => "keyword",
            Target::Locator(_) => "url",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Target::Keyword(k) => k,
            Target::Locator(u) => u,
        }
    }

    /// Human readable name, used in logs and output file names.
    ///
    /// Keywords are used as-is. For locators the place name segment of the
    /// path is used when present (`/maps/place/<name>/...`), otherwise the
    /// last path segment.
    pub fn label(&self) -> String {
        match self {
            Target::Keyword(k) => k.trim().to_string(),
            Target::Locator(u) => locator_label(u).unwrap_or_else(|| "place".to_string()),
        }
    }

    /// Label with characters that are unsafe in file names replaced.
    pub fn file_stem(&self) -> String {
        sanitize_file_stem(&self.label())
    }
}

/// Replace path separators, reserved characters and whitespace with `_`.
pub fn sanitize_file_stem(label: &str) -> String {
    let stem: String = label
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() {
        "target".to_string()
    } else {
        stem
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind(), self.value())
    }
}

fn locator_label(locator: &str) -> Option<String> {
    let url = Url::parse(locator).ok()?;
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

    let raw = segments
        .iter()
        .position(|s| *s == "place")
        .and_then(|i| segments.get(i + 1))
        .or_else(|| segments.last())?;

    // Path segments use form encoding ('+' for spaces) on map links.
    let decoded = url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, _)| k.into_owned())
        .next()?;
    let decoded = decoded.trim().to_string();
    (!decoded.is_empty()).then_some(decoded)
}

/// Ensure a locator carries a language hint (`hl=<locale>`).
///
/// An existing `hl` parameter is left untouched.
pub fn with_locale_hint(locator: &str, locale: &str) -> Result<String> {
    let mut url = Url::parse(locator.trim())?;
    if url.query_pairs().any(|(k, _)| k == "hl") {
        return Ok(url.to_string());
    }
    url.query_pairs_mut().append_pair("hl", locale);
    Ok(url.to_string())
}
