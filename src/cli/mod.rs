pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::harvester::HarvesterConfig;

#[derive(Parser)]
#[command(name = "gleaner")]
#[command(about = "Incremental review harvester for map place pages", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/gleaner/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Harvest reviews for one place
    Harvest {
        /// Search term identifying the place
        #[arg(short, long, conflicts_with = "url", required_unless_present = "url")]
        keyword: Option<String>,

        /// Direct link to the place page
        #[arg(short, long)]
        url: Option<String>,

        /// Number of reviews to collect
        #[arg(short = 'n', long, default_value_t = 50)]
        count: usize,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Pacing preset applied on top of the config file
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Maximum wait per navigation step, in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Write cumulative checkpoints (to PATH, or <label>_checkpoint.csv)
        #[arg(long, num_args = 0..=1, value_name = "PATH")]
        checkpoint: Option<Option<PathBuf>>,

        /// Final output file (default: <label>_<n>_reviews.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Harvest every target listed in a TOML file, one after another
    Batch {
        /// File with [[targets]] entries (keyword or url, count, optional label)
        path: PathBuf,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Pacing preset applied on top of the config file
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Write a <label>_checkpoint.csv next to each result
        #[arg(long)]
        checkpoint: bool,

        /// Skip targets whose last recorded run met its target
        #[arg(long)]
        skip_completed: bool,

        /// Directory for result files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Show recent harvesting runs
    History {
        /// Number of runs to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Named pacing profiles for the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Headless with shorter pauses
    Unattended,
    /// Longer waits and more patience for slow pages
    Patient,
}

impl Preset {
    pub fn harvester(self) -> HarvesterConfig {
        match self {
            Preset::Unattended => HarvesterConfig::unattended(),
            Preset::Patient => HarvesterConfig::patient(),
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
}
