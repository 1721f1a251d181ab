//! Chromium backend over the DevTools protocol.

use std::time::Duration;

use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use mapscout_core::AppConfig;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use super::{Browser, Locator, PageHandle};
use crate::error::BrowserError;

/// Hides the most obvious automation marker from page scripts.
const STEALTH_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser process settings.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    pub language: String,
    /// Upper bound on any single DevTools round trip.
    pub request_timeout: Duration,
}

impl LaunchOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            user_agent: config.session.user_agent.clone(),
            language: "en-US".to_string(),
            request_timeout: Duration::from_secs(config.session.search_timeout_secs),
        }
    }
}

/// A launched Chromium process plus the task draining its event stream.
pub struct ChromiumBrowser {
    inner: CdpBrowser,
    handler_task: JoinHandle<()>,
}

impl ChromiumBrowser {
    /// Launches Chromium with reduced automation fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Launch`] if the configuration is rejected or
    /// the process fails to start.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .window_size(options.viewport_width, options.viewport_height)
            .viewport(Viewport {
                width: options.viewport_width,
                height: options.viewport_height,
                ..Viewport::default()
            })
            .request_timeout(options.request_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", options.user_agent))
            .arg(format!("--lang={}", options.language));
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (inner, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "devtools handler stopped");
                    break;
                }
            }
        });

        tracing::info!(
            headless = options.headless,
            width = options.viewport_width,
            height = options.viewport_height,
            "browser launched"
        );
        Ok(Self {
            inner,
            handler_task,
        })
    }

    /// Closes the browser process and waits for it to exit.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.inner.close().await {
            tracing::warn!(error = %e, "browser close failed");
        }
        if let Err(e) = self.inner.wait().await {
            tracing::debug!(error = %e, "browser wait failed");
        }
        self.handler_task.abort();
    }
}

impl Browser for ChromiumBrowser {
    type Page = ChromiumPage;

    async fn open_page(&self) -> Result<ChromiumPage, BrowserError> {
        let page = self
            .inner
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::OpenPage(e.to_string()))?;
        let page = ChromiumPage::new(page);
        page.inner()?
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
            .map_err(|e| BrowserError::OpenPage(e.to_string()))?;
        Ok(page)
    }
}

/// An open Chromium tab.
///
/// Closing is explicit through [`PageHandle::close`]; a page dropped on an
/// error path is closed from a background task instead.
pub struct ChromiumPage {
    page: Option<Page>,
}

impl ChromiumPage {
    fn new(page: Page) -> Self {
        Self { page: Some(page) }
    }

    fn inner(&self) -> Result<&Page, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::Closed)
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, BrowserError> {
        self.inner()?
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }
}

/// Renders a Rust string as a JS string literal.
fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// JS expression evaluating to the scroll target element, or `null` for the
/// document.
fn js_target(target: Option<&str>) -> String {
    match target {
        Some(selector) => format!("document.querySelector({})", js_str(selector)),
        None => "null".to_string(),
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl PageHandle for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.inner()?
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let url = self
            .inner()?
            .url()
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn query(&self, locator: Locator) -> Result<Option<String>, BrowserError> {
        let read = match locator {
            Locator::Text(_) => "el.innerText || el.textContent || ''".to_string(),
            Locator::Attr(_, attr) => format!("el.getAttribute({}) ?? ''", js_str(attr)),
        };
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); return el ? ({read}) : ''; }})()",
            sel = js_str(locator.selector()),
        );
        self.eval::<String>(script).await.map(non_blank)
    }

    async fn hrefs(&self, selector: &str) -> Result<Vec<String>, BrowserError> {
        let script = format!(
            "Array.from(document.querySelectorAll({})).map(a => a.getAttribute('href') || '').filter(h => h.length > 0)",
            js_str(selector)
        );
        self.eval(script).await
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool, BrowserError> {
        let script = format!("document.querySelector({}) !== null", js_str(selector));
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.eval::<bool>(script.clone()).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn click_labelled(&self, selector: &str, labels: &[&str]) -> Result<bool, BrowserError> {
        let wanted: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
        let wanted = serde_json::to_string(&wanted).map_err(|e| BrowserError::Script(e.to_string()))?;
        let script = format!(
            "(() => {{ const wanted = {wanted}; \
             for (const el of document.querySelectorAll({sel})) {{ \
               const text = (el.innerText || el.textContent || '').trim().toLowerCase(); \
               if (wanted.includes(text)) {{ el.click(); return true; }} \
             }} return false; }})()",
            sel = js_str(selector),
        );
        self.eval(script).await
    }

    async fn scroll_by(&self, target: Option<&str>, delta_px: u64) -> Result<(), BrowserError> {
        let script = format!(
            "(() => {{ const el = {target}; if (el) {{ el.scrollBy(0, {delta_px}); }} else {{ window.scrollBy(0, {delta_px}); }} return true; }})()",
            target = js_target(target),
        );
        self.eval::<bool>(script).await.map(|_| ())
    }

    async fn scroll_height(&self, target: Option<&str>) -> Result<u64, BrowserError> {
        let script = format!(
            "(() => {{ const el = {target}; return Math.floor(el ? el.scrollHeight : document.documentElement.scrollHeight); }})()",
            target = js_target(target),
        );
        self.eval(script).await
    }

    async fn body_text(&self) -> Result<String, BrowserError> {
        self.eval("document.body ? document.body.innerText : ''".to_string())
            .await
    }

    async fn close(mut self) -> Result<(), BrowserError> {
        if let Some(page) = self.page.take() {
            page.close()
                .await
                .map_err(|e| BrowserError::Script(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = page.close().await {
                        tracing::debug!(error = %e, "background page close failed");
                    }
                });
            }
            Err(_) => tracing::debug!("no runtime to close dropped page"),
        }
    }
}
