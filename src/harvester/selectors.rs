//! Selector chains for every element the harvester touches.
//!
//! Each chain is tried in order and the first selector that matches wins.
//! A selector starting with `/`, `./` or `(` is evaluated as XPath, anything
//! else as CSS. Field rules are evaluated relative to the candidate card.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    Css,
    XPath,
}

pub fn selector_kind(selector: &str) -> SelectorKind {
    let s = selector.trim_start();
    if s.starts_with('/') || s.starts_with("./") || s.starts_with('(') {
        SelectorKind::XPath
    } else {
        SelectorKind::Css
    }
}

/// One way of reading a field out of a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub selector: String,
    /// Read this attribute instead of the rendered text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    /// Join the values of every match with a space instead of taking the first.
    #[serde(default)]
    pub join: bool,
}

impl FieldRule {
    pub fn text(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attribute: None,
            join: false,
        }
    }

    pub fn joined(selector: &str) -> Self {
        Self {
            join: true,
            ..Self::text(selector)
        }
    }

    pub fn attribute(selector: &str, attribute: &str) -> Self {
        Self {
            attribute: Some(attribute.to_string()),
            ..Self::text(selector)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub search_input: Vec<String>,
    /// Anything that shows the search has rendered (result list or a detail view).
    pub search_settled: Vec<String>,
    pub first_result: Vec<String>,
    pub reviews_tab: Vec<String>,
    pub sort_button: Vec<String>,
    pub sort_newest: Vec<String>,
    pub scroll_region: Vec<String>,
    pub cards: Vec<String>,
    /// Card attribute holding the page's own review id.
    pub review_id_attribute: String,
    /// In-card "more" controls, relative to the card.
    pub expand: Vec<String>,
    pub author: Vec<FieldRule>,
    pub body: Vec<FieldRule>,
    /// Short bolded keyword spans appended to the body.
    pub tags: Vec<FieldRule>,
    pub rating: Vec<FieldRule>,
    pub date: Vec<FieldRule>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            search_input: strings(&["#searchboxinput", "input[name=\"q\"]"]),
            search_settled: strings(&[
                "div.m6QErb.DxyBCb.kA9KIf.dS8AEf",
                "div[aria-label^='검색 결과']",
                "a.hfpxzc",
                "button[aria-label*=\"리뷰\"]",
            ]),
            first_result: strings(&["a.hfpxzc", "//a[contains(@href,'/maps/place/')]"]),
            reviews_tab: strings(&[
                "//*[contains(text(),'전체 리뷰')]",
                "//*[contains(text(),'리뷰 모두')]",
                "//button[.//div[text()='리뷰'] or .//span[text()='리뷰']]",
                "button[aria-label*=\"리뷰\"]",
                "//button[contains(., '리뷰') and (contains(., '개') or contains(., '전체'))]",
                "//*[contains(text(),'See all reviews')]",
                "//button[.//span[contains(text(),'Reviews')] or contains(.,'Reviews')]",
            ]),
            sort_button: strings(&[
                "button[aria-label*='정렬']",
                "//button[contains(., '정렬') or contains(., 'Sort')]",
            ]),
            sort_newest: strings(&["//*[contains(text(),'최신순') or contains(text(),'Newest')]"]),
            scroll_region: strings(&[
                "div.m6QErb.DxyBCb.kA9KIf.dS8AEf",
                "//div[@role='region' and .//span[contains(text(),'리뷰') or contains(text(),'Reviews')]]",
                "//div[contains(@class,'DxyBCb') and contains(@class,'m6QErb')]",
            ]),
            cards: strings(&["div.jftiEf", "div.jJc9Ad", "//div[@data-review-id]"]),
            review_id_attribute: "data-review-id".to_string(),
            expand: strings(&[
                ".//button[contains(., '자세히') or contains(@aria-label, '더보기')]",
                ".//button[.//span[contains(text(),'더보기')] or contains(., 'More')]",
            ]),
            author: vec![
                FieldRule::text(".d4r55"),
                FieldRule::text(".//div[contains(@class,'d4r55')]"),
                FieldRule::text(".//button[contains(@aria-label,'프로필')]/div"),
            ],
            body: vec![
                FieldRule::text(".wiI7pd"),
                FieldRule::text(".//span[contains(@class,'wiI7pd')]"),
                FieldRule::joined(".//div[contains(@class,'MyEned')]//span"),
            ],
            tags: vec![FieldRule::joined(".PBK6be")],
            rating: vec![
                FieldRule::attribute(".kvMYJc", "aria-label"),
                FieldRule::attribute(
                    ".//span[contains(@aria-label,'별') or contains(@aria-label,'star')]",
                    "aria-label",
                ),
                FieldRule::attribute(".//*[@role='img' and contains(@aria-label,'별표')]", "aria-label"),
            ],
            date: vec![
                FieldRule::text(".rsqaWe"),
                FieldRule::text(".//span[contains(@class,'rsqaWe')]"),
                FieldRule::text(".//span[contains(@class,'dehysf')]"),
                FieldRule::text(".//span/time"),
            ],
        }
    }
}

impl SelectorConfig {
    /// Check that the chains the harvester cannot work without are present.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("reviews_tab", self.reviews_tab.is_empty()),
            ("scroll_region", self.scroll_region.is_empty()),
            ("cards", self.cards.is_empty()),
            ("body", self.body.is_empty()),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, empty)| *empty)
            .map(|(name, _)| *name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("empty selector chains: {}", missing.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_kind_detection() {
        assert_eq!(selector_kind("div.jftiEf"), SelectorKind::Css);
        assert_eq!(selector_kind("button[aria-label*=\"리뷰\"]"), SelectorKind::Css);
        assert_eq!(selector_kind("//div[@data-review-id]"), SelectorKind::XPath);
        assert_eq!(selector_kind(".//span/time"), SelectorKind::XPath);
        assert_eq!(selector_kind("(//a)[1]"), SelectorKind::XPath);
        assert_eq!(selector_kind(".d4r55"), SelectorKind::Css);
    }

    #[test]
    fn test_default_chains_are_valid() {
        let config = SelectorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cards[0], "div.jftiEf");
        assert_eq!(config.rating[0].attribute.as_deref(), Some("aria-label"));
        assert!(config.tags[0].join);
    }

    #[test]
    fn test_validate_reports_empty_chains() {
        let config = SelectorConfig {
            cards: Vec::new(),
            scroll_region: Vec::new(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("cards"));
        assert!(err.contains("scroll_region"));
        assert!(!err.contains("reviews_tab"));
    }

    #[test]
    fn test_field_rule_from_toml() {
        let rule: FieldRule = toml::from_str("selector = \".kvMYJc\"\nattribute = \"aria-label\"").unwrap();
        assert_eq!(rule, FieldRule::attribute(".kvMYJc", "aria-label"));
        assert!(!rule.join);
    }
}
