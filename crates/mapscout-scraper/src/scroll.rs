//! Listing discovery by scrolling the results panel until it stops growing.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use mapscout_core::{RandomRange, SessionConfig};
use regex::Regex;
use reqwest::Url;

use crate::browser::PageHandle;
use crate::cancel::CancellationToken;
use crate::error::ScoutError;
use crate::events::SessionObserver;
use crate::pacing;

/// Results-panel selectors, most specific first.
pub const CONTAINER_LOCATORS: &[&str] = &[
    r#"div[role="feed"]"#,
    "div.m6QErb.DxyBCb",
    "div.m6QErb",
    r#"div[aria-label*="Results"]"#,
];

/// Anchors that may point at a listing page.
pub const LISTING_LINK_SELECTOR: &str = r#"a.hfpxzc, a[href*="/maps/place/"]"#;

/// Path fragment every listing URL carries.
const LISTING_PATH: &str = "/maps/place/";

static END_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)you['’]ve reached the end|النهاية").expect("valid regex")
});

/// Returns `true` if the rendered page says the list is exhausted.
#[must_use]
pub fn has_end_marker(text: &str) -> bool {
    END_MARKER_RE.is_match(text)
}

/// Why discovery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Stabilized,
    EndMarker,
    Capped,
    Cancelled,
    /// The page stopped answering; whatever was gathered is kept.
    PageError,
}

/// Per-discovery bookkeeping: the scroll target, height tracking, and the
/// ordered set of candidate URLs.
#[derive(Debug)]
pub struct ScrollState {
    container: Option<&'static str>,
    last_height: u64,
    no_change: u32,
    threshold: u32,
    max_urls: usize,
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl ScrollState {
    /// `initial_height` is measured before the first scroll. `threshold` is
    /// the number of consecutive unchanged heights that ends discovery.
    #[must_use]
    pub fn new(
        container: Option<&'static str>,
        initial_height: u64,
        threshold: u32,
        max_urls: usize,
    ) -> Self {
        Self {
            container,
            last_height: initial_height,
            no_change: 0,
            threshold: threshold.max(1),
            max_urls,
            urls: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Records a height measurement. Growth resets the no-change counter;
    /// returns `true` once the counter reaches the threshold.
    pub fn observe_height(&mut self, height: u64) -> bool {
        if height == self.last_height {
            self.no_change += 1;
        } else {
            self.no_change = 0;
            self.last_height = height;
        }
        self.no_change >= self.threshold
    }

    /// Adds unseen URLs in order, stopping at the cap. Returns how many were
    /// new.
    pub fn add_urls<I>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut added = 0;
        for url in urls {
            if self.is_full() {
                break;
            }
            if self.seen.insert(url.clone()) {
                self.urls.push(url);
                added += 1;
            }
        }
        added
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.urls.len() >= self.max_urls
    }

    #[must_use]
    pub fn container(&self) -> Option<&'static str> {
        self.container
    }

    #[must_use]
    pub fn no_change_count(&self) -> u32 {
        self.no_change
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    #[must_use]
    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

/// Resolves raw anchors against the page URL and keeps listing links only.
fn listing_urls(base: Option<&Url>, hrefs: Vec<String>) -> Vec<String> {
    hrefs
        .into_iter()
        .filter_map(|href| {
            let href = href.trim();
            if href.is_empty() {
                return None;
            }
            let resolved = match Url::parse(href) {
                Ok(url) => url,
                Err(_) => base?.join(href).ok()?,
            };
            resolved
                .path()
                .contains(LISTING_PATH)
                .then(|| resolved.to_string())
        })
        .collect()
}

/// Outcome of one discovery pass.
#[derive(Debug)]
pub struct Discovery {
    pub urls: Vec<String>,
    pub reason: StopReason,
    pub used_container: bool,
}

pub struct ScrollCollector {
    scroll_pause_ms: RandomRange,
    scroll_step_px: RandomRange,
    threshold: u32,
    max_results: usize,
    container_timeout: Duration,
}

impl ScrollCollector {
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            scroll_pause_ms: config.scroll_pause_ms,
            scroll_step_px: config.scroll_step_px,
            threshold: config.max_scroll_attempts,
            max_results: config.max_results,
            container_timeout: Duration::from_millis(config.container_timeout_ms),
        }
    }

    /// Finds the results panel, trying each locator in priority order.
    async fn locate_container<P: PageHandle>(&self, page: &P) -> Option<&'static str> {
        for &selector in CONTAINER_LOCATORS {
            match page.wait_for(selector, self.container_timeout).await {
                Ok(true) => {
                    tracing::debug!(selector, "results container located");
                    return Some(selector);
                }
                Ok(false) => tracing::debug!(selector, "container locator missed"),
                Err(e) => tracing::debug!(selector, error = %e, "container locator failed"),
            }
        }
        None
    }

    /// Scrolls the already-loaded results page and returns every candidate
    /// listing URL seen, in discovery order.
    ///
    /// Never fails: a missing container degrades to document scrolling and a
    /// page error ends discovery with what was gathered so far.
    pub async fn collect<P, O>(
        &self,
        page: &P,
        cancel: &CancellationToken,
        observer: &O,
    ) -> Discovery
    where
        P: PageHandle,
        O: SessionObserver + ?Sized,
    {
        let container = self.locate_container(page).await;
        if container.is_none() {
            tracing::warn!(
                error = %ScoutError::ContainerNotFound,
                "scrolling the document instead"
            );
        }

        let base = match page.current_url().await {
            Ok(url) => Url::parse(&url).ok(),
            Err(e) => {
                tracing::debug!(error = %e, "could not read search page url");
                None
            }
        };
        let initial_height = page.scroll_height(container).await.unwrap_or(0);
        let mut state =
            ScrollState::new(container, initial_height, self.threshold, self.max_results);

        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            match self.scroll_round(page, base.as_ref(), &mut state).await {
                Ok(round) => {
                    observer.on_status(format!("Found {} places so far...", state.len()));
                    tracing::debug!(
                        found = state.len(),
                        added = round.added,
                        no_change = state.no_change_count(),
                        "scroll round complete"
                    );
                    if state.is_full() {
                        tracing::info!(cap = self.max_results, "result cap reached");
                        break StopReason::Capped;
                    }
                    if round.end_marker {
                        observer.on_status("Reached end of results list".to_string());
                        break StopReason::EndMarker;
                    }
                    if round.stabilized {
                        break StopReason::Stabilized;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, found = state.len(), "discovery interrupted");
                    break StopReason::PageError;
                }
            }
        };

        tracing::info!(found = state.len(), ?reason, "discovery finished");
        Discovery {
            used_container: state.container().is_some(),
            urls: state.into_urls(),
            reason,
        }
    }

    async fn scroll_round<P: PageHandle>(
        &self,
        page: &P,
        base: Option<&Url>,
        state: &mut ScrollState,
    ) -> Result<Round, crate::error::BrowserError> {
        let target = state.container();
        page.scroll_by(target, pacing::sample(self.scroll_step_px)).await?;
        pacing::pause(self.scroll_pause_ms).await;

        let height = page.scroll_height(target).await?;
        let hrefs = page.hrefs(LISTING_LINK_SELECTOR).await?;
        let added = state.add_urls(listing_urls(base, hrefs));
        let end_marker = has_end_marker(&page.body_text().await?);

        Ok(Round {
            added,
            end_marker,
            stabilized: state.observe_height(height),
        })
    }
}

struct Round {
    added: usize,
    end_marker: bool,
    stabilized: bool,
}
