//! Entry sequence: get from a target to an open, scrollable reviews panel.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::app::{GleanerError, Result};
use crate::domain::target::with_locale_hint;
use crate::domain::Target;
use crate::harvester::config::HarvesterConfig;
use crate::harvester::selectors::SelectorConfig;
use crate::harvester::session::ReviewSession;

/// Upper bound on how long the optional sort step may wait per control.
const SORT_STEP_TIMEOUT: Duration = Duration::from_secs(4);

pub struct Navigator<'a> {
    config: &'a HarvesterConfig,
    selectors: &'a SelectorConfig,
}

impl<'a> Navigator<'a> {
    pub fn new(config: &'a HarvesterConfig, selectors: &'a SelectorConfig) -> Self {
        Self { config, selectors }
    }

    /// Position `session` on the target's reviews panel.
    ///
    /// Fails with [`GleanerError::Navigation`] when no reviews control can be
    /// clicked or the review list never shows up.
    pub async fn enter_reviews<S: ReviewSession + ?Sized>(
        &self,
        session: &mut S,
        target: &Target,
    ) -> Result<()> {
        match target {
            Target::Locator(locator) => {
                let url = with_locale_hint(locator, &self.config.locale)?;
                info!("Opening place page {}", url);
                session.open(&url).await?;
            }
            Target::Keyword(keyword) => self.search(session, keyword).await?,
        }

        self.open_reviews_panel(session).await?;

        if self.sort_by_newest(session).await {
            info!("Reviews sorted newest first");
        } else {
            debug!("Sort control unavailable, keeping the page's default order");
        }

        if self
            .wait_for(session, &self.selectors.scroll_region, self.config.timeout())
            .await?
            .is_none()
        {
            return Err(GleanerError::Navigation(
                "review list region did not appear".to_string(),
            ));
        }
        Ok(())
    }

    async fn search<S: ReviewSession + ?Sized>(&self, session: &mut S, keyword: &str) -> Result<()> {
        info!("Searching for '{}'", keyword);
        session.open(&self.config.search_url).await?;

        let Some(input) = self
            .wait_for(session, &self.selectors.search_input, self.config.timeout())
            .await?
        else {
            return Err(GleanerError::Navigation("search box not found".to_string()));
        };
        session
            .submit_search(&self.selectors.search_input[input], keyword)
            .await?;

        // Either a result list or, for unambiguous queries, the detail view.
        if self
            .wait_for(session, &self.selectors.search_settled, self.config.timeout())
            .await?
            .is_none()
        {
            warn!("Search results did not render in time, continuing");
        }

        if self.click_first(session, &self.selectors.first_result).await?.is_some() {
            debug!("Opened first search result");
            sleep(self.config.settle_after_click()).await;
        } else {
            debug!("No result list, assuming the detail view is already open");
        }
        Ok(())
    }

    async fn open_reviews_panel<S: ReviewSession + ?Sized>(&self, session: &mut S) -> Result<()> {
        match self
            .click_first_within(session, &self.selectors.reviews_tab, self.config.timeout())
            .await?
        {
            Some(index) => {
                debug!("Reviews control matched '{}'", self.selectors.reviews_tab[index]);
                sleep(self.config.settle_after_click()).await;
                Ok(())
            }
            None => Err(GleanerError::Navigation(format!(
                "no reviews control became clickable within {}s ({} selectors tried)",
                self.config.timeout_secs,
                self.selectors.reviews_tab.len()
            ))),
        }
    }

    /// Best-effort switch to newest-first ordering; never fails the run.
    pub async fn sort_by_newest<S: ReviewSession + ?Sized>(&self, session: &mut S) -> bool {
        let step_timeout = self.config.timeout().min(SORT_STEP_TIMEOUT);

        let opened = self
            .click_first_within(session, &self.selectors.sort_button, step_timeout)
            .await;
        if !matches!(opened, Ok(Some(_))) {
            return false;
        }
        sleep(self.config.settle_after_click() / 2).await;

        let picked = self
            .click_first_within(session, &self.selectors.sort_newest, step_timeout)
            .await;
        match picked {
            Ok(Some(_)) => {
                sleep(self.config.settle_after_click()).await;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Sort selection failed: {}", e);
                false
            }
        }
    }

    /// Poll until some selector of `chain` matches or `timeout` elapses.
    async fn wait_for<S: ReviewSession + ?Sized>(
        &self,
        session: &mut S,
        chain: &[String],
        timeout: Duration,
    ) -> Result<Option<usize>> {
        if chain.is_empty() {
            return Ok(None);
        }
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(index) = session.find_first(chain).await? {
                return Ok(Some(index));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(self.config.poll_interval()).await;
        }
    }

    /// One pass over `chain` in priority order; index of the selector clicked.
    async fn click_first<S: ReviewSession + ?Sized>(
        &self,
        session: &mut S,
        chain: &[String],
    ) -> Result<Option<usize>> {
        for (index, selector) in chain.iter().enumerate() {
            if session.click(selector).await? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Repeat [`Self::click_first`] until something is clicked or `timeout` elapses.
    async fn click_first_within<S: ReviewSession + ?Sized>(
        &self,
        session: &mut S,
        chain: &[String],
        timeout: Duration,
    ) -> Result<Option<usize>> {
        if chain.is_empty() {
            return Ok(None);
        }
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(index) = self.click_first(session, chain).await? {
                return Ok(Some(index));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(self.config.poll_interval()).await;
        }
    }
}
