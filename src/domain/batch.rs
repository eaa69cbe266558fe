use std::path::Path;

use serde::Deserialize;

use crate::app::{GleanerError, Result};
use crate::domain::Target;

/// A list of targets harvested one after another.
///
/// ```toml
/// [[targets]]
/// keyword = "여의도한강공원"
/// count = 5000
///
/// [[targets]]
/// url = "https://maps.app.goo.gl/5sWZUxuAvqb1oZLP8"
/// count = 1500
/// label = "서울대공원"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BatchPlan {
    #[serde(default)]
    pub targets: Vec<TargetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetEntry {
    pub keyword: Option<String>,
    pub url: Option<String>,
    pub count: usize,
    /// Overrides the name used for output files.
    pub label: Option<String>,
}

impl TargetEntry {
    pub fn target(&self) -> Result<Target> {
        match (&self.keyword, &self.url) {
            (Some(_), Some(_)) => Err(GleanerError::Config(
                "a target takes either `keyword` or `url`, not both".into(),
            )),
            (Some(k), None) if !k.trim().is_empty() => Ok(Target::Keyword(k.clone())),
            (None, Some(u)) if !u.trim().is_empty() => Ok(Target::Locator(u.clone())),
            _ => Err(GleanerError::Config(
                "a target needs a non-empty `keyword` or `url`".into(),
            )),
        }
    }
}

impl BatchPlan {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GleanerError::SourceNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let plan: BatchPlan = toml::from_str(content)
            .map_err(|e| GleanerError::Config(format!("invalid batch file: {}", e)))?;
        for entry in &plan.targets {
            entry.target()?;
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_targets() {
        let plan = BatchPlan::parse(
            r#"
[[targets]]
keyword = "반포한강공원"
count = 5000

[[targets]]
url = "https://maps.app.goo.gl/abc"
count = 1500
label = "서울대공원"
"#,
        )
        .unwrap();

        assert_eq!(plan.targets.len(), 2);
        assert_eq!(plan.targets[0].target().unwrap(), Target::Keyword("반포한강공원".into()));
        assert_eq!(plan.targets[1].count, 1500);
        assert_eq!(plan.targets[1].label.as_deref(), Some("서울대공원"));
    }

    #[test]
    fn test_rejects_entry_with_both_kinds() {
        let err = BatchPlan::parse(
            r#"
[[targets]]
keyword = "a"
url = "https://example.com"
count = 1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, GleanerError::Config(_)));
    }

    #[test]
    fn test_rejects_entry_without_target() {
        let err = BatchPlan::parse("[[targets]]\ncount = 3\n").unwrap_err();
        assert!(matches!(err, GleanerError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = BatchPlan::load(&path).unwrap_err();
        assert!(matches!(err, GleanerError::SourceNotFound(p) if p == path));
    }
}
