//! Configuration management for Gleaner.
//!
//! Configuration is read from `~/.config/gleaner/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use crate::harvester::{HarvesterConfig, SelectorConfig};
use crate::store::OutputConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub harvester: HarvesterConfig,
    pub output: OutputConfig,
    pub selectors: SelectorConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config
            .selectors
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                path: path.to_path_buf(),
                reason,
            })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/gleaner/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("gleaner").join("config.toml"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Gleaner Configuration
#
# Selectors starting with "/", "./" or "(" are XPath, anything else is CSS.
# Every list is tried in order; the first selector that works wins.
# Sections or keys left out fall back to built-in defaults.

[harvester]
# Run the browser without a window
headless = false

# Maximum wait per navigation step (seconds)
timeout_secs = 12

# Give up after this many scroll rounds without a new review
stagnation_threshold = 6

# Rewrite the checkpoint file each time this many more reviews are held
checkpoint_every = 100

# Scroll commands per round and the random pause after each (milliseconds)
scrolls_per_iteration = 3
scroll_delay_min_ms = 600
scroll_delay_max_ms = 1100

# "More" buttons pressed per round, and the pause before reading the cards
# (milliseconds). Cards still collapsed once the budget is spent wait for the
# next round.
expand_limit = 5
settle_after_expand_ms = 300

# Body characters used to identify reviews that have no id of their own
fallback_body_chars = 120

# Drop reviews whose text is empty
discard_empty_body = false

# Remove "0:06"-style media timecodes from review text
strip_timecodes = true

# Entry point for keyword searches and the language hint for direct links
search_url = "https://www.google.co.kr/maps/?hl=ko"
locale = "ko"
language_arg = "ko-KR"

# Expand maps.app.goo.gl style links before opening them
resolve_short_links = true

[output]
# Directory for result files when no explicit path is given
directory = "."

# Prefix CSV files with a byte-order mark (spreadsheet friendly)
write_bom = true

[output.columns]
author = "작성자"
body = "내용"
rating = "별점"
date = "작성일"

[selectors]
# Review cards in the list
cards = ["div.jftiEf", "div.jJc9Ad", "//div[@data-review-id]"]

# Controls that open the reviews panel, in priority order
reviews_tab = [
    "//*[contains(text(),'전체 리뷰')]",
    "//*[contains(text(),'리뷰 모두')]",
    "//button[.//div[text()='리뷰'] or .//span[text()='리뷰']]",
    "button[aria-label*=\"리뷰\"]",
    "//button[contains(., '리뷰') and (contains(., '개') or contains(., '전체'))]",
    "//*[contains(text(),'See all reviews')]",
    "//button[.//span[contains(text(),'Reviews')] or contains(.,'Reviews')]",
]

# Field rules: selector, optional attribute to read, join = use every match
rating = [
    { selector = ".kvMYJc", attribute = "aria-label" },
    { selector = ".//span[contains(@aria-label,'별') or contains(@aria-label,'star')]", attribute = "aria-label" },
    { selector = ".//*[@role='img' and contains(@aria-label,'별표')]", attribute = "aria-label" },
]
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config file at {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
