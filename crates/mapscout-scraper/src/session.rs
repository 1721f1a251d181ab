//! One end-to-end search: discovery, extraction, and lifecycle events.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use mapscout_core::SessionConfig;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::Instrument;
use uuid::Uuid;

use crate::browser::{goto_with_timeout, Browser, PageHandle};
use crate::cancel::CancellationToken;
use crate::dedup::DedupIndex;
use crate::detail::DetailExtractor;
use crate::enrich::ContactEnricher;
use crate::error::ScoutError;
use crate::events::SessionObserver;
use crate::scheduler::{ExtractionScheduler, SchedulerSummary};
use crate::scroll::{ScrollCollector, StopReason};

/// Labels of the cookie-consent button shown before the results load.
const CONSENT_LABELS: &[&str] = &["Accept all", "قبول الكل"];
const CONSENT_SETTLE: Duration = Duration::from_millis(500);

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub category: String,
    pub region: String,
    pub city: String,
    pub district: Option<String>,
}

impl SearchQuery {
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        region: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            region: region.into(),
            city: city.into(),
            district: None,
        }
    }

    /// Narrows the search to a district. Blank values are ignored.
    #[must_use]
    pub fn with_district(mut self, district: impl Into<String>) -> Self {
        let district = district.into();
        self.district = (!district.trim().is_empty()).then(|| district.trim().to_string());
        self
    }

    /// Free-text phrase sent to the listings service.
    #[must_use]
    pub fn phrase(&self) -> String {
        let category = self.category.trim();
        let city = self.city.trim();
        match self.district.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(district) => format!("{category} {district} {city}"),
            None => format!("{category} in {city}, {}", self.region.trim()),
        }
    }

    /// Search URL for the phrase with a fixed locale hint.
    #[must_use]
    pub fn search_url(&self, maps_base_url: &str, locale: &str) -> String {
        let phrase = utf8_percent_encode(&self.phrase(), NON_ALPHANUMERIC).to_string();
        let locale = utf8_percent_encode(locale, NON_ALPHANUMERIC);
        format!(
            "{}/search/{phrase}?hl={locale}",
            maps_base_url.trim_end_matches('/')
        )
    }
}

/// Requests a cooperative stop of the session it came from. Cloneable and
/// usable from any thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    cancel: CancellationToken,
    session_id: Uuid,
}

impl StopHandle {
    /// Sets the stop flag and returns immediately. Idempotent.
    pub fn stop(&self) {
        if self.cancel.cancel() {
            tracing::info!(session_id = %self.session_id, "stop requested");
        }
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// How a session ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Candidate URLs found during discovery.
    pub discovered: usize,
    /// Absent when the session ended before extraction began.
    pub extraction: Option<SchedulerSummary>,
    pub cancelled: bool,
    /// Top-level failure, already reported as a status message.
    pub error: Option<String>,
}

/// A single search run with its own stop flag and dedup index.
pub struct SearchSession {
    id: Uuid,
    config: SessionConfig,
    cancel: CancellationToken,
    dedup: Arc<Mutex<DedupIndex>>,
}

impl SearchSession {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            cancel: CancellationToken::new(),
            dedup: Arc::new(Mutex::new(DedupIndex::new())),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            cancel: self.cancel.clone(),
            session_id: self.id,
        }
    }

    /// Runs the search to completion, cancellation, or failure.
    ///
    /// `observer.on_complete` fires exactly once after everything else, on
    /// every path. Failures, including panics, are reported through
    /// `on_status` as `Error during search: ...`.
    pub async fn run<B, O>(self, browser: &B, query: &SearchQuery, observer: &O) -> SessionReport
    where
        B: Browser,
        O: SessionObserver + ?Sized,
    {
        let span = tracing::info_span!("session", session_id = %self.id);
        let outcome = AssertUnwindSafe(self.drive(browser, query, observer).instrument(span))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(ScoutError::Session("search task panicked".to_string())));

        let report = match outcome {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "search failed");
                observer.on_status(format!("Error during search: {e}"));
                SessionReport {
                    cancelled: self.cancel.is_cancelled(),
                    error: Some(e.to_string()),
                    ..SessionReport::default()
                }
            }
        };
        observer.on_complete();
        report
    }

    async fn drive<B, O>(
        &self,
        browser: &B,
        query: &SearchQuery,
        observer: &O,
    ) -> Result<SessionReport, ScoutError>
    where
        B: Browser,
        O: SessionObserver + ?Sized,
    {
        let phrase = query.phrase();
        let url = query.search_url(&self.config.maps_base_url, &self.config.locale);
        tracing::info!(%phrase, %url, "search starting");
        observer.on_status(format!("Searching: {phrase}"));

        let page = browser.open_page().await?;
        let discovered = async {
            goto_with_timeout(
                &page,
                &url,
                Duration::from_secs(self.config.search_timeout_secs),
            )
            .await?;
            accept_consent(&page).await;
            Ok::<_, ScoutError>(
                ScrollCollector::new(&self.config)
                    .collect(&page, &self.cancel, observer)
                    .await,
            )
        }
        .await;
        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "search page close failed");
        }
        let discovery = discovered?;

        let mut report = SessionReport {
            discovered: discovery.urls.len(),
            ..SessionReport::default()
        };
        if discovery.reason == StopReason::Cancelled || self.cancel.is_cancelled() {
            observer.on_status("Stopping...".to_string());
            report.cancelled = true;
            return Ok(report);
        }
        if discovery.urls.is_empty() {
            observer.on_status("No results found".to_string());
            return Ok(report);
        }

        let extractor = DetailExtractor::new(
            &self.config,
            ContactEnricher::new(&self.config)?,
            Arc::clone(&self.dedup),
        );
        let summary = ExtractionScheduler::new(&self.config)
            .run(browser, &extractor, discovery.urls, &self.cancel, observer)
            .await;

        if summary.cancelled {
            observer.on_status(format!(
                "Stopped. Extracted {} businesses before stopping.",
                summary.accepted
            ));
        } else {
            observer.on_status(format!(
                "Completed! Extracted {} businesses with enhanced data.",
                summary.accepted
            ));
        }
        report.cancelled = summary.cancelled;
        report.extraction = Some(summary);
        Ok(report)
    }
}

/// Dismisses the cookie-consent dialog if one is showing.
async fn accept_consent<P: PageHandle>(page: &P) {
    match page.click_labelled("button", CONSENT_LABELS).await {
        Ok(true) => {
            tracing::debug!("cookie consent accepted");
            tokio::time::sleep(CONSENT_SETTLE).await;
        }
        Ok(false) => {}
        Err(e) => tracing::debug!(error = %e, "consent click failed"),
    }
}
