use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime knobs for a harvesting run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvesterConfig {
    /// Whether to run the browser without a window (default: false)
    pub headless: bool,

    /// Maximum wait per navigation step in seconds (default: 12)
    pub timeout_secs: u64,

    /// Interval between polls while waiting for an element in milliseconds (default: 250)
    pub poll_interval_ms: u64,

    /// Consecutive iterations without new records before giving up (default: 6)
    pub stagnation_threshold: usize,

    /// Write a checkpoint every time this many more records are held (default: 100)
    pub checkpoint_every: usize,

    /// Scroll commands issued per loop iteration (default: 3)
    pub scrolls_per_iteration: usize,

    /// Lower bound of the random pause after each scroll in milliseconds (default: 600)
    pub scroll_delay_min_ms: u64,

    /// Upper bound of the random pause after each scroll in milliseconds (default: 1100)
    pub scroll_delay_max_ms: u64,

    /// Pause after clicking a navigation control in milliseconds (default: 800)
    pub settle_after_click_ms: u64,

    /// Maximum "more" buttons pressed per iteration (default: 5)
    pub expand_limit: usize,

    /// Pause between pressing "more" buttons and reading the cards in milliseconds (default: 300)
    pub settle_after_expand_ms: u64,

    /// Body characters that feed the composite identity (default: 120)
    pub fallback_body_chars: usize,

    /// Drop candidate items whose body text is empty (default: false)
    pub discard_empty_body: bool,

    /// Remove `m:ss` style tokens from body text (default: true)
    pub strip_timecodes: bool,

    /// Search entry point used for keyword targets
    pub search_url: String,

    /// Value of the `hl` hint added to direct locators (default: "ko")
    pub locale: String,

    /// Browser `--lang` argument (default: "ko-KR")
    pub language_arg: String,

    /// Browser window width in pixels (default: 1280)
    pub window_width: u32,

    /// Browser window height in pixels (default: 2200)
    pub window_height: u32,

    /// User agent string to use
    pub user_agent: Option<String>,

    /// Expand short links over HTTP before opening them (default: true)
    pub resolve_short_links: bool,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            headless: false,
            timeout_secs: 12,
            poll_interval_ms: 250,
            stagnation_threshold: 6,
            checkpoint_every: 100,
            scrolls_per_iteration: 3,
            scroll_delay_min_ms: 600,
            scroll_delay_max_ms: 1100,
            settle_after_click_ms: 800,
            expand_limit: 5,
            settle_after_expand_ms: 300,
            fallback_body_chars: 120,
            discard_empty_body: false,
            strip_timecodes: true,
            search_url: "https://www.google.co.kr/maps/?hl=ko".to_string(),
            locale: "ko".to_string(),
            language_arg: "ko-KR".to_string(),
            window_width: 1280,
            window_height: 2200,
            user_agent: None,
            resolve_short_links: true,
        }
    }
}

impl HarvesterConfig {
    /// Get the per-step timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Limit for a single page script or browser command, at least one second
    /// so that a zero step timeout still leaves the page time to answer
    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn settle_after_click(&self) -> Duration {
        Duration::from_millis(self.settle_after_click_ms)
    }

    pub fn settle_after_expand(&self) -> Duration {
        Duration::from_millis(self.settle_after_expand_ms)
    }

    /// Pause bounds after a scroll, normalized so that `min <= max`
    pub fn scroll_delay_bounds(&self) -> (u64, u64) {
        let min = self.scroll_delay_min_ms.min(self.scroll_delay_max_ms);
        let max = self.scroll_delay_min_ms.max(self.scroll_delay_max_ms);
        (min, max)
    }

    /// Take the pacing of `preset` (window mode, waits, delays, patience) and
    /// keep everything else, such as the search entry point and locale
    pub fn with_pacing(self, preset: &HarvesterConfig) -> Self {
        Self {
            headless: preset.headless,
            timeout_secs: preset.timeout_secs,
            poll_interval_ms: preset.poll_interval_ms,
            stagnation_threshold: preset.stagnation_threshold,
            scroll_delay_min_ms: preset.scroll_delay_min_ms,
            scroll_delay_max_ms: preset.scroll_delay_max_ms,
            settle_after_click_ms: preset.settle_after_click_ms,
            settle_after_expand_ms: preset.settle_after_expand_ms,
            ..self
        }
    }

    /// Create a config for unattended runs (headless, shorter pauses)
    pub fn unattended() -> Self {
        Self {
            headless: true,
            scroll_delay_min_ms: 400,
            scroll_delay_max_ms: 800,
            settle_after_click_ms: 500,
            ..Default::default()
        }
    }

    /// Create a config for slow or flaky pages (longer waits, more patience)
    pub fn patient() -> Self {
        Self {
            timeout_secs: 30,
            stagnation_threshold: 10,
            scroll_delay_min_ms: 1200,
            scroll_delay_max_ms: 2500,
            settle_after_click_ms: 1500,
            ..Default::default()
        }
    }
}
