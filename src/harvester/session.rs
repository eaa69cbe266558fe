use async_trait::async_trait;

use crate::app::Result;
use crate::harvester::extractor::RawCard;

/// One interactive rendering session positioned on a single page.
///
/// Element lookups take selector chains (see
/// [`SelectorConfig`](crate::harvester::SelectorConfig)); waiting and retry
/// policy belong to the caller, every method here is a single attempt.
#[async_trait]
pub trait ReviewSession: Send {
    /// Load `url` in the session's page.
    async fn open(&mut self, url: &str) -> Result<()>;

    /// Index of the first selector in `chain` that currently matches anything.
    async fn find_first(&mut self, chain: &[String]) -> Result<Option<usize>>;

    /// Click the first visible match of `selector`. `Ok(false)` when nothing
    /// clickable matched.
    async fn click(&mut self, selector: &str) -> Result<bool>;

    /// Type `query` into the input matched by `input_selector` and submit it.
    async fn submit_search(&mut self, input_selector: &str, query: &str) -> Result<()>;

    /// Press the "more" control of at most `limit` rendered cards not listed
    /// in `seen_ids`. Returns how many were pressed.
    async fn expand_cards(&mut self, seen_ids: &[String], limit: usize) -> Result<usize>;

    /// Read every rendered review card not listed in `seen_ids`.
    async fn collect_cards(&mut self, seen_ids: &[String]) -> Result<Vec<RawCard>>;

    /// Scroll the review list region to its end. `Ok(false)` when the region
    /// is gone.
    async fn scroll_reviews(&mut self) -> Result<bool>;

    /// Release the rendering engine. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}
