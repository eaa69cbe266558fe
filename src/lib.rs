//! # Gleaner
//!
//! Collects user reviews for a place from an interactive map page by
//! driving a real Chrome instance.
//!
//! ## Architecture
//!
//! ```text
//! Target → Navigator → Harvester → ReviewStore → CSV
//!                          ↘ Checkpointer    ↘ run log
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Harvest 700 reviews by keyword, with checkpoints
//! gleaner harvest --keyword "뚝섬한강공원" -n 700 --checkpoint
//!
//! # Harvest from a direct link
//! gleaner harvest --url "https://maps.app.goo.gl/..." -n 300
//!
//! # Work through a list of places
//! gleaner batch parks.toml --headless --skip-completed
//!
//! # See what ran
//! gleaner history
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct carries the loaded config
/// and the run log.
pub mod app;

/// Configuration loaded from `~/.config/gleaner/config.toml`.
pub mod config;

/// Command-line interface using clap.
///
/// - `harvest` - Harvest one place by keyword or URL
/// - `batch <file>` - Harvest every place listed in a TOML file
/// - `history` - Show recorded runs
/// - `config path|show` - Inspect configuration
pub mod cli;

/// Core domain models.
///
/// - [`Target`](domain::Target): keyword or locator
/// - [`ReviewRecord`](domain::ReviewRecord): one review with its identity
/// - [`BatchPlan`](domain::BatchPlan): list of targets for batch runs
pub mod domain;

/// Browser-driven review harvesting.
///
/// - [`ReviewSession`](harvester::ReviewSession): async trait over the page
/// - [`ChromeSession`](harvester::ChromeSession): chromiumoxide implementation
/// - [`Harvester`](harvester::Harvester): the pagination loop
pub mod harvester;

/// Review accumulation, CSV output, checkpoints and the SQLite run log.
pub mod store;
