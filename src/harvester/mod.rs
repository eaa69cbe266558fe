//! Incremental review harvester.
//!
//! Drives one browser session from a target to its reviews panel, then
//! alternates extraction and scrolling until enough reviews are held, the
//! list stops growing, or the browser fails.
//!
//! # Architecture
//!
//! ```text
//! Target → Navigator → [collect cards → extract → store → scroll]* → CSV
//!                                             ↘ Checkpointer
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use gleaner::config::Config;
//! use gleaner::domain::Target;
//! use gleaner::harvester::{harvest, HarvestRequest};
//!
//! let config = Config::default();
//! let request = HarvestRequest::new(Target::Keyword("뚝섬한강공원".into()), 700);
//! let report = harvest(&config, request).await?;
//! println!("{} reviews ({})", report.records.len(), report.termination);
//! ```

mod chrome;
mod config;
mod extractor;
mod locator;
mod navigator;
mod scripts;
mod selectors;
mod session;

pub use chrome::ChromeSession;
pub use config::HarvesterConfig;
pub use extractor::{Extraction, RawCard, ReviewExtractor};
pub use locator::{expand_locator, is_short_link};
pub use navigator::Navigator;
pub use scripts::PageScripts;
pub use selectors::{selector_kind, FieldRule, SelectorConfig, SelectorKind};
pub use session::ReviewSession;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::config::Config;
use crate::domain::target::sanitize_file_stem;
use crate::domain::{ReviewRecord, Target};
use crate::store::{write_records, Checkpointer, OutputConfig, ReviewStore, RunStatus};

/// One harvesting job.
#[derive(Debug, Clone)]
pub struct HarvestRequest {
    pub target: Target,
    /// Desired number of reviews.
    pub count: usize,
    /// Where to write cumulative snapshots while the run is in progress.
    pub checkpoint: Option<PathBuf>,
    /// Final output path; defaults to `<dir>/<label>_<n>_reviews.csv`.
    pub output: Option<PathBuf>,
    /// Name used for default output files instead of the target's own label.
    pub label: Option<String>,
}

impl HarvestRequest {
    pub fn new(target: Target, count: usize) -> Self {
        Self {
            target,
            count,
            checkpoint: None,
            output: None,
            label: None,
        }
    }

    pub fn label(&self) -> String {
        self.label
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.target.label())
    }

    pub fn file_stem(&self) -> String {
        sanitize_file_stem(&self.label())
    }
}

/// Why the pagination loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    TargetMet,
    Stagnant,
    /// The browser failed mid-loop; what was collected up to then is kept.
    EngineFault(String),
}

impl Termination {
    pub fn status(&self) -> RunStatus {
        match self {
            Termination::TargetMet => RunStatus::TargetMet,
            Termination::Stagnant => RunStatus::Stagnant,
            Termination::EngineFault(_) => RunStatus::EngineFault,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::TargetMet => f.write_str("target met"),
            Termination::Stagnant => f.write_str("no new reviews"),
            Termination::EngineFault(e) => write!(f, "browser failure: {}", e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub target: Target,
    pub label: String,
    pub requested: usize,
    pub termination: Termination,
    /// Records held when the loop stopped, before truncation to `requested`.
    pub accumulated: usize,
    pub iterations: usize,
    /// Final output, at most `requested` records in discovery order.
    pub records: Vec<ReviewRecord>,
    pub output_path: Option<PathBuf>,
    pub checkpoint_path: Option<PathBuf>,
}

/// Runs the pagination loop against any [`ReviewSession`].
pub struct Harvester {
    config: HarvesterConfig,
    selectors: SelectorConfig,
    output: OutputConfig,
    extractor: ReviewExtractor,
}

impl Harvester {
    pub fn new(config: HarvesterConfig, selectors: SelectorConfig, output: OutputConfig) -> Self {
        let extractor = ReviewExtractor::new(&config);
        Self {
            config,
            selectors,
            output,
            extractor,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.harvester.clone(),
            config.selectors.clone(),
            config.output.clone(),
        )
    }

    /// Enter the target's reviews panel, harvest, and write the results.
    ///
    /// Navigation failure is returned as an error and writes nothing. Any
    /// other ending, including a browser failure mid-loop, returns a report
    /// and leaves the checkpoint holding every record accumulated.
    pub async fn run<S: ReviewSession + ?Sized>(
        &self,
        session: &mut S,
        request: &HarvestRequest,
    ) -> Result<HarvestReport> {
        let label = request.label();
        info!("Harvesting {} (target: {} reviews)", request.target, request.count);

        Navigator::new(&self.config, &self.selectors)
            .enter_reviews(session, &request.target)
            .await?;

        let mut store = ReviewStore::new();
        let mut checkpointer = Checkpointer::new(
            request.checkpoint.clone(),
            self.config.checkpoint_every,
            self.output.clone(),
        );

        let (termination, iterations) = self
            .paginate(session, request.count, &mut store, &mut checkpointer)
            .await?;

        checkpointer.flush(&store)?;

        let records = store.truncated(request.count);
        let output_path = if records.is_empty() {
            warn!("No reviews collected for '{}', skipping output file", label);
            None
        } else {
            let path = request
                .output
                .clone()
                .unwrap_or_else(|| self.output.result_path(&request.file_stem(), records.len()));
            write_records(&path, &records, &self.output)?;
            Some(path)
        };

        info!(
            "Finished '{}': {} ({} of {} reviews, {} iterations)",
            label,
            termination,
            records.len(),
            request.count,
            iterations
        );

        Ok(HarvestReport {
            target: request.target.clone(),
            label,
            requested: request.count,
            termination,
            accumulated: store.len(),
            iterations,
            records,
            output_path,
            checkpoint_path: checkpointer.path().map(|p| p.to_path_buf()),
        })
    }

    /// Extract, scroll, repeat. Only checkpoint write failures are returned
    /// as errors; session failures end the loop as [`Termination::EngineFault`].
    async fn paginate<S: ReviewSession + ?Sized>(
        &self,
        session: &mut S,
        target: usize,
        store: &mut ReviewStore,
        checkpointer: &mut Checkpointer,
    ) -> Result<(Termination, usize)> {
        let threshold = self.config.stagnation_threshold.max(1);
        let mut stagnant = 0;
        let mut iterations = 0;

        let termination = loop {
            if store.len() >= target {
                break Termination::TargetMet;
            }
            iterations += 1;
            let before = store.len();

            if let Err(e) = self.harvest_visible(session, store).await {
                warn!("Extraction failed after {} reviews: {}", store.len(), e);
                break Termination::EngineFault(e.to_string());
            }

            if store.len() < target {
                if let Err(e) = self.scroll(session).await {
                    warn!("Scrolling failed after {} reviews: {}", store.len(), e);
                    break Termination::EngineFault(e.to_string());
                }
            }

            if store.len() > before {
                stagnant = 0;
            } else {
                stagnant += 1;
            }

            checkpointer.maybe_flush(store)?;
            info!(
                "Collected {} / {} reviews (iteration {}, stagnant {})",
                store.len(),
                target,
                iterations,
                stagnant
            );

            if store.len() >= target {
                break Termination::TargetMet;
            }
            if stagnant >= threshold {
                break Termination::Stagnant;
            }
        };

        Ok((termination, iterations))
    }

    /// Extract every rendered card into `store`; returns the number added.
    ///
    /// Collapsed cards are pressed open first. When the expand budget is used
    /// up, cards that are still collapsed are left for a later pass instead of
    /// being stored with truncated text.
    async fn harvest_visible<S: ReviewSession + ?Sized>(
        &self,
        session: &mut S,
        store: &mut ReviewStore,
    ) -> Result<usize> {
        let seen = store.stable_ids();
        let limit = self.config.expand_limit;

        let pressed = session.expand_cards(&seen, limit).await?;
        if pressed > 0 {
            sleep(self.config.settle_after_expand()).await;
        }
        let budget_spent = limit > 0 && pressed >= limit;

        let cards = session.collect_cards(&seen).await?;

        let mut added = 0;
        let mut deferred = 0;
        for card in &cards {
            if card.truncated && budget_spent {
                deferred += 1;
                continue;
            }
            let missing = card.missing_fields();
            match self.extractor.extract(card, store) {
                Extraction::New(record) => {
                    if !missing.is_empty() {
                        debug!(
                            "Review {} has empty fields: {:?}",
                            record.identity, missing
                        );
                    }
                    if store.insert(record) {
                        added += 1;
                    }
                }
                Extraction::Seen => {}
                Extraction::Discarded => debug!("Discarded card without content"),
            }
        }
        if deferred > 0 {
            debug!("{} collapsed reviews left for the next pass", deferred);
        }
        Ok(added)
    }

    async fn scroll<S: ReviewSession + ?Sized>(&self, session: &mut S) -> Result<()> {
        let (min, max) = self.config.scroll_delay_bounds();
        for _ in 0..self.config.scrolls_per_iteration.max(1) {
            if !session.scroll_reviews().await? {
                debug!("Review list region not found while scrolling");
            }
            let pause = rand::thread_rng().gen_range(min..=max);
            sleep(Duration::from_millis(pause)).await;
        }
        Ok(())
    }
}

/// Run one harvest on `session` and close it afterwards, whatever the outcome.
pub async fn harvest_with<S: ReviewSession + ?Sized>(
    config: &Config,
    session: &mut S,
    request: &HarvestRequest,
) -> Result<HarvestReport> {
    let result = Harvester::from_config(config).run(session, request).await;

    if let Err(e) = session.close().await {
        warn!("Failed to close browser cleanly: {}", e);
    }
    result
}

/// Launch a browser, run one harvest, and always shut the browser down.
pub async fn harvest(config: &Config, mut request: HarvestRequest) -> Result<HarvestReport> {
    if config.harvester.resolve_short_links {
        if let Target::Locator(locator) = &request.target {
            let resolved = expand_locator(
                locator,
                config.harvester.timeout(),
                config.harvester.user_agent.as_deref(),
            )
            .await;
            request.target = Target::Locator(resolved);
        }
    }

    let mut session = ChromeSession::launch(&config.harvester, config.selectors.clone()).await?;
    harvest_with(config, &mut session, &request).await
}

/// Something that can carry out a [`HarvestRequest`] end to end.
#[async_trait::async_trait]
pub trait HarvestRunner: Send + Sync {
    async fn run(&self, config: &Config, request: HarvestRequest) -> Result<HarvestReport>;
}

/// Runs each request in its own Chrome session.
pub struct ChromeRunner;

#[async_trait::async_trait]
impl HarvestRunner for ChromeRunner {
    async fn run(&self, config: &Config, request: HarvestRequest) -> Result<HarvestReport> {
        harvest(config, request).await
    }
}
