//! Bounded-concurrency fan-out of listing extraction.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::pin::pin;

use futures::{future, stream, FutureExt, StreamExt};
use mapscout_core::SessionConfig;

use crate::browser::Browser;
use crate::cancel::CancellationToken;
use crate::dedup::url_token;
use crate::detail::DetailExtractor;
use crate::events::SessionObserver;

/// Counters for one extraction batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    /// URLs scheduled after the URL-token pre-filter.
    pub total: usize,
    /// URLs dropped by the pre-filter.
    pub prefiltered: usize,
    pub completed: usize,
    pub accepted: usize,
    pub failed: usize,
    /// URLs never submitted because a stop was requested.
    pub abandoned: usize,
    pub cancelled: bool,
}

pub struct ExtractionScheduler {
    max_concurrent_pages: usize,
}

/// Drops candidates whose URL token was already seen, keeping first
/// occurrences in order.
fn prefilter(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url_token(url)))
        .collect()
}

impl ExtractionScheduler {
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            max_concurrent_pages: config.max_concurrent_pages.max(1),
        }
    }

    /// Extracts every URL with at most `max_concurrent_pages` tasks in
    /// flight, reporting records to `observer` in completion order.
    ///
    /// A failing or panicking task is reported as a status message and
    /// counted; it never stops the batch. Once `cancel` is set no further
    /// task is submitted, but tasks already running finish and their
    /// records are still delivered.
    pub async fn run<B, O>(
        &self,
        browser: &B,
        extractor: &DetailExtractor,
        urls: Vec<String>,
        cancel: &CancellationToken,
        observer: &O,
    ) -> SchedulerSummary
    where
        B: Browser,
        O: SessionObserver + ?Sized,
    {
        let discovered = urls.len();
        let pending = prefilter(urls);
        let mut summary = SchedulerSummary {
            total: pending.len(),
            prefiltered: discovered - pending.len(),
            ..SchedulerSummary::default()
        };
        tracing::info!(
            total = summary.total,
            prefiltered = summary.prefiltered,
            concurrency = self.max_concurrent_pages,
            "extraction starting"
        );
        observer.on_status(format!("Starting extraction for {} places...", summary.total));

        let mut results = pin!(stream::iter(pending)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|url| async move {
                let outcome = AssertUnwindSafe(extractor.process(browser, &url, cancel))
                    .catch_unwind()
                    .await;
                (url, outcome)
            })
            .buffer_unordered(self.max_concurrent_pages));

        while let Some((url, outcome)) = results.next().await {
            summary.completed += 1;
            match outcome {
                Ok(Ok(Some(record))) => {
                    summary.accepted += 1;
                    observer.on_record(record);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    summary.failed += 1;
                    tracing::warn!(url = %url, error = %e, "extraction failed");
                    observer.on_status(format!("Error processing {url}: {e}"));
                }
                Err(_) => {
                    summary.failed += 1;
                    tracing::error!(url = %url, "extraction task panicked");
                    observer.on_status(format!("Error processing {url}: task panicked"));
                }
            }
            observer.on_status(format!(
                "Processing... ({}/{})",
                summary.completed, summary.total
            ));
        }

        summary.cancelled = cancel.is_cancelled();
        summary.abandoned = summary.total - summary.completed;
        tracing::info!(
            completed = summary.completed,
            accepted = summary.accepted,
            failed = summary.failed,
            abandoned = summary.abandoned,
            "extraction finished"
        );
        summary
    }
}
