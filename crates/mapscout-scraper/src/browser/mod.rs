//! Seam between the pipeline and a live browser.
//!
//! Everything above this module talks to pages only through [`Browser`] and
//! [`PageHandle`], so the collector, extractor, and scheduler can be driven by
//! a scripted page in tests and by Chromium in production.

mod chromium;
#[cfg(test)]
pub(crate) mod fake;

use std::future::Future;
use std::time::Duration;

use crate::error::{BrowserError, ScoutError};

pub use chromium::{ChromiumBrowser, ChromiumPage, LaunchOptions};

/// How to read a value off the first element matching a CSS selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// Rendered inner text.
    Text(&'static str),
    /// Named attribute.
    Attr(&'static str, &'static str),
}

impl Locator {
    #[must_use]
    pub fn selector(self) -> &'static str {
        match self {
            Locator::Text(selector) | Locator::Attr(selector, _) => selector,
        }
    }
}

/// Opens isolated pages. One page is one browsing context owned by exactly
/// one task for its lifetime.
pub trait Browser: Send + Sync {
    type Page: PageHandle;

    fn open_page(&self) -> impl Future<Output = Result<Self::Page, BrowserError>> + Send;
}

/// One open page.
///
/// `target` arguments name a scrollable element by CSS selector; `None`
/// means the document itself.
pub trait PageHandle: Send + Sync {
    /// Navigates and waits for the document to load.
    fn goto(&self, url: &str) -> impl Future<Output = Result<(), BrowserError>> + Send;

    /// URL after redirects and client-side rewrites.
    fn current_url(&self) -> impl Future<Output = Result<String, BrowserError>> + Send;

    /// Value of the first element matching the locator, trimmed. `None` when
    /// nothing matches or the value is blank.
    fn query(
        &self,
        locator: Locator,
    ) -> impl Future<Output = Result<Option<String>, BrowserError>> + Send;

    /// Raw `href` attribute of every element matching `selector`, in
    /// document order.
    fn hrefs(&self, selector: &str)
        -> impl Future<Output = Result<Vec<String>, BrowserError>> + Send;

    /// Polls until an element matches `selector` or `timeout` elapses.
    fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<bool, BrowserError>> + Send;

    /// Clicks the first element matching `selector` whose text equals one
    /// of `labels`, ignoring case. Returns `false` when none matched.
    fn click_labelled(
        &self,
        selector: &str,
        labels: &[&str],
    ) -> impl Future<Output = Result<bool, BrowserError>> + Send;

    fn scroll_by(
        &self,
        target: Option<&str>,
        delta_px: u64,
    ) -> impl Future<Output = Result<(), BrowserError>> + Send;

    fn scroll_height(
        &self,
        target: Option<&str>,
    ) -> impl Future<Output = Result<u64, BrowserError>> + Send;

    /// Rendered text of the whole document.
    fn body_text(&self) -> impl Future<Output = Result<String, BrowserError>> + Send;

    fn close(self) -> impl Future<Output = Result<(), BrowserError>> + Send;
}

/// Navigates with a hard deadline, mapping failures to pipeline errors.
pub(crate) async fn goto_with_timeout<P: PageHandle>(
    page: &P,
    url: &str,
    timeout: Duration,
) -> Result<(), ScoutError> {
    match tokio::time::timeout(timeout, page.goto(url)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ScoutError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(ScoutError::NavigationTimeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        }),
    }
}
