use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Prefix of identities taken from the page's own review id.
const STABLE_PREFIX: &str = "id::";
/// Prefix of identities derived from author, date and the head of the body.
const COMPOSITE_PREFIX: &str = "mix::";

/// One harvested review.
///
/// Records are immutable once built: a card that is re-rendered later with
/// different content keeps the record from its first extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub identity: String,
    pub author: String,
    pub body: String,
    pub rating: String,
    pub date: String,
}

impl ReviewRecord {
    pub fn new(
        review_id: Option<&str>,
        author: impl Into<String>,
        body: impl Into<String>,
        rating: impl Into<String>,
        date: impl Into<String>,
        fallback_body_chars: usize,
    ) -> Self {
        let author = author.into();
        let body = body.into();
        let date = date.into();
        let identity = Self::derive_identity(review_id, &author, &date, &body, fallback_body_chars);
        Self {
            identity,
            author,
            body,
            rating: rating.into(),
            date,
        }
    }

    /// Identity of a review: the page-provided id when there is one,
    /// otherwise a hash of author, date and the first `fallback_body_chars`
    /// characters of the body.
    ///
    /// The composite form is approximate. Two distinct reviews with the same
    /// author, date and opening text collapse into one, and a review whose
    /// text renders differently across passes can be counted twice.
    pub fn derive_identity(
        review_id: Option<&str>,
        author: &str,
        date: &str,
        body: &str,
        fallback_body_chars: usize,
    ) -> String {
        if let Some(id) = review_id.map(str::trim).filter(|id| !id.is_empty()) {
            return Self::stable_identity(id);
        }

        let head: String = body.trim().chars().take(fallback_body_chars).collect();
        let mut hasher = Sha256::new();
        hasher.update(author.trim().as_bytes());
        hasher.update(b"|");
        hasher.update(date.trim().as_bytes());
        hasher.update(b"|");
        hasher.update(head.as_bytes());
        format!("{COMPOSITE_PREFIX}{}", hex::encode(hasher.finalize()))
    }

    /// Identity for a page-provided review id.
    pub fn stable_identity(review_id: &str) -> String {
        format!("{STABLE_PREFIX}{}", review_id.trim())
    }

    pub fn has_stable_id(&self) -> bool {
        self.identity.starts_with(STABLE_PREFIX)
    }

    /// Row values in output column order.
    pub fn to_csv_record(&self) -> [&str; 4] {
        [&self.author, &self.body, &self.rating, &self.date]
    }
}

/// Extractable review fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Author,
    Body,
    Rating,
    Date,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Author => "author",
            Field::Body => "body",
            Field::Rating => "rating",
            Field::Date => "date",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_prefers_review_id() {
        let id = ReviewRecord::derive_identity(Some("ChZDSUhN"), "kim", "1주 전", "좋아요", 120);
        assert_eq!(id, "id::ChZDSUhN");
    }

    #[test]
    fn test_blank_review_id_falls_back_to_composite() {
        let id = ReviewRecord::derive_identity(Some("  "), "kim", "1주 전", "좋아요", 120);
        assert!(id.starts_with("mix::"));
        assert_eq!(id.len(), "mix::".len() + 64);
    }

    #[test]
    fn test_composite_identity_deterministic() {
        let a = ReviewRecord::derive_identity(None, "kim", "1주 전", "산책하기 좋아요", 120);
        let b = ReviewRecord::derive_identity(None, "kim", "1주 전", "산책하기 좋아요", 120);
        assert_eq!(a, b);
    }

    #[test]
    fn test_composite_identity_only_reads_body_head() {
        let shared = "가".repeat(120);
        let a = ReviewRecord::derive_identity(None, "kim", "어제", &format!("{shared} 끝"), 120);
        let b = ReviewRecord::derive_identity(None, "kim", "어제", &format!("{shared} 다름"), 120);
        assert_eq!(a, b);

        let c = ReviewRecord::derive_identity(None, "lee", "어제", &shared, 120);
        assert_ne!(a, c);
    }

    #[test]
    fn test_has_stable_id() {
        let stable = ReviewRecord::new(Some("r1"), "kim", "body", "별표 5개", "어제", 120);
        let derived = ReviewRecord::new(None, "kim", "body", "별표 5개", "어제", 120);
        assert!(stable.has_stable_id());
        assert!(!derived.has_stable_id());
    }

    #[test]
    fn test_csv_record_column_order() {
        let record = ReviewRecord::new(Some("r1"), "kim", "body", "별표 5개", "어제", 120);
        assert_eq!(record.to_csv_record(), ["kim", "body", "별표 5개", "어제"]);
    }
}
