/// Desktop Chrome user agent used for both the automated browser and the
/// website enrichment crawl.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_MAPS_BASE_URL: &str = "https://www.google.com/maps";

/// Inclusive `[min, max]` range a random value is drawn from.
///
/// Used for pacing intervals (milliseconds) and scroll deltas (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomRange {
    pub min: u64,
    pub max: u64,
}

impl RandomRange {
    #[must_use]
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// A range that always yields `value`.
    #[must_use]
    pub const fn fixed(value: u64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }
}

/// Knobs for one search session: pacing, bounds, and timeouts.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Admission gate size: how many listing pages may be open at once.
    pub max_concurrent_pages: usize,
    /// Pause after each scroll of the results list, in milliseconds.
    pub scroll_pause_ms: RandomRange,
    /// Pixel delta applied per scroll.
    pub scroll_step_px: RandomRange,
    /// Settle delay after navigating to a listing page, in milliseconds.
    pub click_delay_ms: RandomRange,
    /// Consecutive unchanged-height observations that end discovery.
    pub max_scroll_attempts: u32,
    /// Safety cap on discovered listing URLs.
    pub max_results: usize,
    pub search_timeout_secs: u64,
    pub navigation_timeout_secs: u64,
    /// Wait budget for each results-container locator.
    pub container_timeout_ms: u64,
    /// Budget for a single field locator attempt.
    pub field_timeout_ms: u64,
    pub enrich_timeout_secs: u64,
    pub enrich_secondary_timeout_secs: u64,
    pub max_socials: usize,
    /// Dial prefix folded away when normalizing phones for dedup.
    pub phone_country_code: String,
    /// Locale hint sent with every search so text markers stay stable.
    pub locale: String,
    pub maps_base_url: String,
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pages: 4,
            scroll_pause_ms: RandomRange::new(2500, 4500),
            scroll_step_px: RandomRange::new(2500, 5000),
            click_delay_ms: RandomRange::new(1500, 3000),
            max_scroll_attempts: 20,
            max_results: 10_000,
            search_timeout_secs: 60,
            navigation_timeout_secs: 20,
            container_timeout_ms: 5000,
            field_timeout_ms: 2000,
            enrich_timeout_secs: 10,
            enrich_secondary_timeout_secs: 8,
            max_socials: 5,
            phone_country_code: "966".to_string(),
            locale: "en".to_string(),
            maps_base_url: DEFAULT_MAPS_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub session: SessionConfig,
}
