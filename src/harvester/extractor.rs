use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::domain::{Field, ReviewRecord};
use crate::harvester::config::HarvesterConfig;
use crate::store::ReviewStore;

/// Short `m:ss` / `hh:mm` tokens left behind by embedded media players.
static TIMECODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}:\d{2}\b").expect("timecode pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Field values of one rendered card, as read by the page script.
///
/// Every field is an empty string when none of its rules matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCard {
    pub review_id: String,
    pub author: String,
    pub body: String,
    pub tags: String,
    pub rating: String,
    pub date: String,
    /// The card still showed a "more" control when it was read.
    pub truncated: bool,
}

impl RawCard {
    /// Fields for which every extraction rule came back empty.
    pub fn missing_fields(&self) -> Vec<Field> {
        [
            (Field::Author, &self.author),
            (Field::Body, &self.body),
            (Field::Rating, &self.rating),
            (Field::Date, &self.date),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    fn review_id(&self) -> Option<&str> {
        Some(self.review_id.trim()).filter(|id| !id.is_empty())
    }
}

/// What became of one candidate card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    New(ReviewRecord),
    /// Identity already held by the store; nothing was built.
    Seen,
    /// Card carried nothing worth keeping.
    Discarded,
}

/// Turns raw card values into review records
pub struct ReviewExtractor {
    fallback_body_chars: usize,
    discard_empty_body: bool,
    strip_timecodes: bool,
}

impl ReviewExtractor {
    pub fn new(config: &HarvesterConfig) -> Self {
        Self {
            fallback_body_chars: config.fallback_body_chars,
            discard_empty_body: config.discard_empty_body,
            strip_timecodes: config.strip_timecodes,
        }
    }

    /// Main text followed by the tag run, on a single line.
    pub fn normalize_body(&self, main: &str, tags: &str) -> String {
        let merged = format!("{} {}", main.trim(), tags.trim());
        let merged = if self.strip_timecodes {
            TIMECODE.replace_all(&merged, "").into_owned()
        } else {
            merged
        };
        WHITESPACE.replace_all(merged.trim(), " ").into_owned()
    }

    /// Build a record from `card` unless the store already holds its identity.
    pub fn extract(&self, card: &RawCard, store: &ReviewStore) -> Extraction {
        if let Some(id) = card.review_id() {
            if store.contains(&ReviewRecord::stable_identity(id)) {
                return Extraction::Seen;
            }
        }

        let body = self.normalize_body(&card.body, &card.tags);
        let author = card.author.trim();
        let rating = card.rating.trim();
        let date = card.date.trim();

        if body.is_empty() && (self.discard_empty_body || (author.is_empty() && date.is_empty())) {
            return Extraction::Discarded;
        }

        let record = ReviewRecord::new(
            card.review_id(),
            author,
            body,
            rating,
            date,
            self.fallback_body_chars,
        );
        if store.contains(&record.identity) {
            return Extraction::Seen;
        }
        Extraction::New(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ReviewExtractor {
        ReviewExtractor::new(&HarvesterConfig::default())
    }

    fn card(id: &str, author: &str, body: &str) -> RawCard {
        RawCard {
            review_id: id.into(),
            author: author.into(),
            body: body.into(),
            rating: "별표 5개".into(),
            date: "2주 전".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_body_flattens_newlines() {
        let body = extractor().normalize_body("산책하기\n좋아요\r\n강추", "");
        assert_eq!(body, "산책하기 좋아요 강추");
    }

    #[test]
    fn test_normalize_body_appends_tags_and_strips_timecodes() {
        let body = extractor().normalize_body("야경이 예뻐요 0:06", "주차 편함 화장실");
        assert_eq!(body, "야경이 예뻐요 주차 편함 화장실");
    }

    #[test]
    fn test_normalize_body_keeps_timecodes_when_disabled() {
        let config = HarvesterConfig {
            strip_timecodes: false,
            ..Default::default()
        };
        let body = ReviewExtractor::new(&config).normalize_body("12:30 도착", "");
        assert_eq!(body, "12:30 도착");
    }

    #[test]
    fn test_extract_new_record_with_review_id() {
        let store = ReviewStore::new();
        match extractor().extract(&card("r1", "kim", "좋아요"), &store) {
            Extraction::New(record) => {
                assert_eq!(record.identity, "id::r1");
                assert_eq!(record.author, "kim");
                assert_eq!(record.rating, "별표 5개");
            }
            other => panic!("expected a new record, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_skips_seen_identity() {
        let mut store = ReviewStore::new();
        let ex = extractor();
        let Extraction::New(record) = ex.extract(&card("r1", "kim", "좋아요"), &store) else {
            panic!("first extraction should produce a record");
        };
        assert!(store.insert(record));

        let rerendered = card("r1", "kim", "좋아요 (expanded text)");
        assert_eq!(ex.extract(&rerendered, &store), Extraction::Seen);
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].body, "좋아요");
    }

    #[test]
    fn test_extract_keeps_record_with_missing_rating() {
        let store = ReviewStore::new();
        let mut raw = card("r2", "lee", "그늘이 많아요");
        raw.rating = String::new();
        assert_eq!(raw.missing_fields(), vec![Field::Rating]);

        let Extraction::New(record) = extractor().extract(&raw, &store) else {
            panic!("missing rating must not drop the card");
        };
        assert_eq!(record.rating, "");
    }

    #[test]
    fn test_extract_empty_body_policy() {
        let store = ReviewStore::new();
        let raw = card("r3", "park", "");

        assert!(matches!(extractor().extract(&raw, &store), Extraction::New(_)));

        let strict = ReviewExtractor::new(&HarvesterConfig {
            discard_empty_body: true,
            ..Default::default()
        });
        assert_eq!(strict.extract(&raw, &store), Extraction::Discarded);
    }

    #[test]
    fn test_extract_discards_blank_card() {
        let store = ReviewStore::new();
        assert_eq!(extractor().extract(&RawCard::default(), &store), Extraction::Discarded);
    }

    #[test]
    fn test_composite_identity_collision_keeps_first() {
        let mut store = ReviewStore::new();
        let ex = extractor();
        let first = card("", "kim", "한강 뷰가 최고");
        let twin = card("", "kim", "한강 뷰가 최고");

        let Extraction::New(record) = ex.extract(&first, &store) else {
            panic!("first card should be new");
        };
        assert!(!record.has_stable_id());
        store.insert(record);
        assert_eq!(ex.extract(&twin, &store), Extraction::Seen);
    }

    #[test]
    fn test_raw_card_deserializes_from_page_result() {
        let value = serde_json::json!({
            "reviewId": "abc",
            "author": "kim",
            "body": "b",
            "tags": "",
            "rating": "",
            "date": "어제"
        });
        let raw: RawCard = serde_json::from_value(value).unwrap();
        assert_eq!(raw.review_id, "abc");
        assert_eq!(raw.missing_fields(), vec![Field::Rating]);
    }
}
