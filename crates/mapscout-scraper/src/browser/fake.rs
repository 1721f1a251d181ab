//! Scripted in-memory browser for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Browser, Locator, PageHandle};
use crate::error::BrowserError;

/// Text shown by the fake results list once the end marker is reached.
pub(crate) const END_TEXT: &str = "You've reached the end of the list.";

/// One listing page.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeListing {
    /// URL reported after navigation; defaults to the requested URL.
    pub final_url: Option<String>,
    /// Values keyed by `(selector, attribute)`; `None` attribute means text.
    pub values: HashMap<(String, Option<String>), String>,
}

impl FakeListing {
    pub fn with_text(mut self, selector: &str, value: &str) -> Self {
        self.values
            .insert((selector.to_string(), None), value.to_string());
        self
    }

    pub fn with_attr(mut self, selector: &str, attr: &str, value: &str) -> Self {
        self.values.insert(
            (selector.to_string(), Some(attr.to_string())),
            value.to_string(),
        );
        self
    }

    pub fn with_final_url(mut self, url: &str) -> Self {
        self.final_url = Some(url.to_string());
        self
    }
}

/// The results page returned for any URL that is not a known listing.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeSearch {
    /// Selectors that resolve on the results page.
    pub present: HashSet<String>,
    /// Scroll height after N scroll calls; the last entry repeats.
    pub heights: Vec<u64>,
    /// Links in the DOM after N scroll calls; the last entry repeats.
    pub links: Vec<Vec<String>>,
    /// Scroll count from which the end marker text is shown.
    pub end_after: Option<usize>,
    /// Labels a consent button answers to.
    pub consent_labels: Vec<String>,
}

type GotoHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Script {
    search: FakeSearch,
    listings: HashMap<String, FakeListing>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    slow_selectors: HashSet<String>,
    goto_delay: Duration,
    fail_open: bool,
    on_goto: Option<GotoHook>,
}

/// Counters shared by a browser and every page it opened.
#[derive(Debug, Default)]
pub(crate) struct FakeStats {
    pub open_now: AtomicUsize,
    pub max_open: AtomicUsize,
    pub opened: AtomicUsize,
    pub gotos: Mutex<Vec<String>>,
    pub scroll_targets: Mutex<Vec<Option<String>>>,
    pub clicks: AtomicUsize,
    /// Pages released through `PageHandle::close` rather than by drop.
    pub closes: AtomicUsize,
}

#[derive(Clone, Default)]
pub(crate) struct FakeBrowser {
    script: Arc<Mutex<Script>>,
    pub stats: Arc<FakeStats>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(self, search: FakeSearch) -> Self {
        self.script.lock().unwrap().search = search;
        self
    }

    pub fn with_listing(self, url: &str, listing: FakeListing) -> Self {
        self.script
            .lock()
            .unwrap()
            .listings
            .insert(url.to_string(), listing);
        self
    }

    pub fn failing(self, url: &str) -> Self {
        self.script.lock().unwrap().failing.insert(url.to_string());
        self
    }

    pub fn panicking(self, url: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .panicking
            .insert(url.to_string());
        self
    }

    pub fn slow_selector(self, selector: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .slow_selectors
            .insert(selector.to_string());
        self
    }

    pub fn with_goto_delay(self, delay: Duration) -> Self {
        self.script.lock().unwrap().goto_delay = delay;
        self
    }

    pub fn failing_open(self) -> Self {
        self.script.lock().unwrap().fail_open = true;
        self
    }

    pub fn on_goto(self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.script.lock().unwrap().on_goto = Some(Arc::new(hook));
        self
    }

    pub fn max_open(&self) -> usize {
        self.stats.max_open.load(Ordering::SeqCst)
    }

    pub fn open_now(&self) -> usize {
        self.stats.open_now.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.stats.opened.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.stats.closes.load(Ordering::SeqCst)
    }

    pub fn gotos(&self) -> Vec<String> {
        self.stats.gotos.lock().unwrap().clone()
    }
}

impl Browser for FakeBrowser {
    type Page = FakePage;

    async fn open_page(&self) -> Result<FakePage, BrowserError> {
        if self.script.lock().unwrap().fail_open {
            return Err(BrowserError::OpenPage("scripted failure".to_string()));
        }
        let now = self.stats.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_open.fetch_max(now, Ordering::SeqCst);
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakePage {
            script: Arc::clone(&self.script),
            stats: Arc::clone(&self.stats),
            url: Mutex::new(String::new()),
            scrolls: AtomicUsize::new(0),
        })
    }
}

pub(crate) struct FakePage {
    script: Arc<Mutex<Script>>,
    stats: Arc<FakeStats>,
    url: Mutex<String>,
    scrolls: AtomicUsize,
}

impl FakePage {
    fn listing(&self) -> Option<FakeListing> {
        let url = self.url.lock().unwrap().clone();
        let script = self.script.lock().unwrap();
        script
            .listings
            .values()
            .find(|l| l.final_url.as_deref() == Some(url.as_str()))
            .or_else(|| script.listings.get(&url))
            .cloned()
    }

    fn round(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    fn search(&self) -> FakeSearch {
        self.script.lock().unwrap().search.clone()
    }
}

fn at_round<T: Clone>(items: &[T], round: usize) -> Option<T> {
    items.get(round).or_else(|| items.last()).cloned()
}

impl PageHandle for FakePage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let (delay, fails, panics, hook, final_url) = {
            let script = self.script.lock().unwrap();
            (
                script.goto_delay,
                script.failing.contains(url),
                script.panicking.contains(url),
                script.on_goto.clone(),
                script
                    .listings
                    .get(url)
                    .and_then(|l| l.final_url.clone()),
            )
        };
        self.stats.gotos.lock().unwrap().push(url.to_string());
        if let Some(hook) = hook {
            hook(url);
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        assert!(!panics, "scripted panic for {url}");
        if fails {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        *self.url.lock().unwrap() = final_url.unwrap_or_else(|| url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn query(&self, locator: Locator) -> Result<Option<String>, BrowserError> {
        let slow = self
            .script
            .lock()
            .unwrap()
            .slow_selectors
            .contains(locator.selector());
        if slow {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        let Some(listing) = self.listing() else {
            return Ok(None);
        };
        let key = match locator {
            Locator::Text(selector) => (selector.to_string(), None),
            Locator::Attr(selector, attr) => (selector.to_string(), Some(attr.to_string())),
        };
        Ok(listing
            .values
            .get(&key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    async fn hrefs(&self, _selector: &str) -> Result<Vec<String>, BrowserError> {
        Ok(at_round(&self.search().links, self.round()).unwrap_or_default())
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<bool, BrowserError> {
        Ok(self.search().present.contains(selector))
    }

    async fn click_labelled(&self, _selector: &str, labels: &[&str]) -> Result<bool, BrowserError> {
        let search = self.search();
        let hit = labels
            .iter()
            .any(|l| search.consent_labels.iter().any(|c| c.eq_ignore_ascii_case(l)));
        if hit {
            self.stats.clicks.fetch_add(1, Ordering::SeqCst);
        }
        Ok(hit)
    }

    async fn scroll_by(&self, target: Option<&str>, _delta_px: u64) -> Result<(), BrowserError> {
        self.stats
            .scroll_targets
            .lock()
            .unwrap()
            .push(target.map(str::to_string));
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn scroll_height(&self, _target: Option<&str>) -> Result<u64, BrowserError> {
        Ok(at_round(&self.search().heights, self.round()).unwrap_or(0))
    }

    async fn body_text(&self) -> Result<String, BrowserError> {
        let search = self.search();
        match search.end_after {
            Some(round) if self.round() >= round => Ok(END_TEXT.to_string()),
            _ => Ok("Results".to_string()),
        }
    }

    async fn close(self) -> Result<(), BrowserError> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for FakePage {
    fn drop(&mut self) {
        self.stats.open_now.fetch_sub(1, Ordering::SeqCst);
    }
}
