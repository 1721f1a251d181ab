//! Field extraction from one listing page.

use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::time::Duration;

use mapscout_core::{PlaceRecord, RandomRange, SessionConfig};
use regex::Regex;
use reqwest::Url;

use crate::browser::{goto_with_timeout, Browser, Locator, PageHandle};
use crate::cancel::CancellationToken;
use crate::dedup::{DedupDecision, DedupIndex, PlaceIdentity};
use crate::enrich::ContactEnricher;
use crate::error::ScoutError;
use crate::pacing;

static AT_COORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(-?\d+\.\d+),(-?\d+\.\d+)").expect("valid regex"));
static DATA_COORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!3d(-?\d+\.\d+)!4d(-?\d+\.\d+)").expect("valid regex"));
static PHONE_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\d+\s()-]").expect("valid regex"));
static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:[.,]\d)?)").expect("valid regex"));

/// Ordered locators for one field plus the cleanup applied to a raw hit.
/// The first locator whose cleaned value is `Some` wins.
#[derive(Debug, Clone, Copy)]
pub struct FieldStrategy {
    pub field: &'static str,
    pub locators: &'static [Locator],
    pub clean: fn(&str) -> Option<String>,
}

pub const NAME: FieldStrategy = FieldStrategy {
    field: "name",
    locators: &[Locator::Text("h1.DUwDvf"), Locator::Text("h1")],
    clean: clean_text,
};

pub const PHONE: FieldStrategy = FieldStrategy {
    field: "phone",
    locators: &[
        Locator::Text(r#"button[data-item-id*="phone"]"#),
        Locator::Attr(r#"button[data-item-id*="phone"]"#, "aria-label"),
        Locator::Attr(r#"a[href^="tel:"]"#, "href"),
    ],
    clean: clean_phone,
};

pub const ADDRESS: FieldStrategy = FieldStrategy {
    field: "address",
    locators: &[
        Locator::Text(r#"button[data-item-id*="address"]"#),
        Locator::Attr(r#"button[data-item-id*="address"]"#, "aria-label"),
    ],
    clean: clean_address,
};

pub const WEBSITE: FieldStrategy = FieldStrategy {
    field: "website",
    locators: &[
        Locator::Attr(r#"a[data-item-id="authority"]"#, "href"),
        Locator::Attr(r#"a[aria-label^="Website"]"#, "href"),
    ],
    clean: clean_website,
};

pub const RATING: FieldStrategy = FieldStrategy {
    field: "rating",
    locators: &[
        Locator::Attr(r#"span[role="img"][aria-label*="star"]"#, "aria-label"),
        Locator::Attr(r#"div[role="img"][aria-label*="star"]"#, "aria-label"),
        Locator::Text(r#"div.F7nice span[aria-hidden="true"]"#),
    ],
    clean: clean_rating,
};

/// Icon glyphs rendered from private-use code points prefix some fields.
fn is_private_use(c: char) -> bool {
    ('\u{e000}'..='\u{f8ff}').contains(&c)
}

fn clean_text(raw: &str) -> Option<String> {
    let text: String = raw.chars().filter(|c| !is_private_use(*c)).collect();
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Keeps digits, `+`, spaces, parentheses, and hyphens.
fn clean_phone(raw: &str) -> Option<String> {
    let raw = raw.trim_start_matches("tel:");
    let kept = PHONE_STRIP_RE.replace_all(raw, "");
    let phone = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    let phone = phone.trim_matches(|c: char| c == '-' || c.is_whitespace());
    phone
        .chars()
        .any(|c| c.is_ascii_digit())
        .then(|| phone.to_string())
}

fn clean_address(raw: &str) -> Option<String> {
    let text = clean_text(raw)?;
    let text = text.strip_prefix("Address:").map_or(text.as_str(), str::trim);
    (!text.is_empty()).then(|| text.to_string())
}

/// Accepts absolute http(s) URLs and unwraps `/url?q=` redirect links.
fn clean_website(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.starts_with("/url?") {
        let wrapped = Url::parse("https://www.google.com").ok()?.join(raw).ok()?;
        let target = wrapped
            .query_pairs()
            .find(|(k, _)| k == "q" || k == "url")
            .map(|(_, v)| v.into_owned())?;
        return clean_website(&target);
    }
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn clean_rating(raw: &str) -> Option<String> {
    let caps = RATING_RE.captures(raw)?;
    let value = caps[1].replace(',', ".");
    let rating = value.parse::<f32>().ok()?;
    (0.0..=5.0).contains(&rating).then_some(value)
}

fn parse_pair(re: &Regex, url: &str) -> Option<(f64, f64)> {
    let caps = re.captures(url)?;
    let lat = caps[1].parse::<f64>().ok()?;
    let lng = caps[2].parse::<f64>().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)).then_some((lat, lng))
}

/// Coordinates from a listing URL: the `@lat,lng` viewport first, then the
/// `!3d..!4d..` data segment.
#[must_use]
pub fn parse_coordinates(url: &str) -> Option<(f64, f64)> {
    parse_pair(&AT_COORDS_RE, url).or_else(|| parse_pair(&DATA_COORDS_RE, url))
}

/// Extracts [`PlaceRecord`]s from listing pages.
pub struct DetailExtractor {
    navigation_timeout: Duration,
    click_delay_ms: RandomRange,
    field_timeout: Duration,
    phone_country_code: String,
    enricher: ContactEnricher,
    dedup: Arc<Mutex<DedupIndex>>,
}

impl DetailExtractor {
    #[must_use]
    pub fn new(
        config: &SessionConfig,
        enricher: ContactEnricher,
        dedup: Arc<Mutex<DedupIndex>>,
    ) -> Self {
        Self {
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            click_delay_ms: config.click_delay_ms,
            field_timeout: Duration::from_millis(config.field_timeout_ms),
            phone_country_code: config.phone_country_code.clone(),
            enricher,
            dedup,
        }
    }

    /// Runs one field strategy against an open page.
    async fn first_match<P: PageHandle>(
        &self,
        page: &P,
        strategy: &FieldStrategy,
    ) -> Option<String> {
        for locator in strategy.locators {
            match tokio::time::timeout(self.field_timeout, page.query(*locator)).await {
                Ok(Ok(Some(raw))) => {
                    if let Some(value) = (strategy.clean)(&raw) {
                        return Some(value);
                    }
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    tracing::debug!(
                        field = strategy.field,
                        selector = locator.selector(),
                        error = %e,
                        "locator failed"
                    );
                }
                Err(_) => {
                    tracing::debug!(
                        field = strategy.field,
                        selector = locator.selector(),
                        "locator timed out"
                    );
                }
            }
        }
        let exhausted = ScoutError::SelectorExhaustion {
            field: strategy.field,
        };
        tracing::debug!(error = %exhausted, "field absent");
        None
    }

    /// Reads every field off a page that has already been navigated to
    /// `candidate_url`. Enrichment fields are left empty.
    pub async fn extract<P: PageHandle>(&self, page: &P, candidate_url: &str) -> PlaceRecord {
        let name = self.first_match(page, &NAME).await;
        let phone = self.first_match(page, &PHONE).await;
        let address = self.first_match(page, &ADDRESS).await;
        let website = self.first_match(page, &WEBSITE).await;
        let rating = self
            .first_match(page, &RATING)
            .await
            .and_then(|r| r.parse::<f32>().ok());

        let source_url = match page.current_url().await {
            Ok(url) if !url.is_empty() => url,
            Ok(_) => candidate_url.to_string(),
            Err(e) => {
                tracing::debug!(url = candidate_url, error = %e, "could not read final url");
                candidate_url.to_string()
            }
        };
        let coordinates =
            parse_coordinates(&source_url).or_else(|| parse_coordinates(candidate_url));

        PlaceRecord {
            name,
            phone,
            address,
            website,
            emails: Vec::new(),
            socials: Vec::new(),
            latitude: coordinates.map(|(lat, _)| lat),
            longitude: coordinates.map(|(_, lng)| lng),
            rating,
            source_url,
        }
    }

    /// Opens a fresh page for `candidate_url`, extracts its fields, checks
    /// the session dedup index, and enriches accepted records from their
    /// website.
    ///
    /// Returns `Ok(None)` for duplicates and when `cancel` was already set.
    /// A stop requested after extraction skips enrichment but keeps the
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError`] if the page cannot be opened or navigation
    /// fails or times out.
    pub async fn process<B: Browser>(
        &self,
        browser: &B,
        candidate_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PlaceRecord>, ScoutError> {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let page = browser.open_page().await?;
        let loaded = async {
            goto_with_timeout(&page, candidate_url, self.navigation_timeout).await?;
            pacing::pause(self.click_delay_ms).await;
            Ok::<_, ScoutError>(self.extract(&page, candidate_url).await)
        }
        .await;
        if let Err(e) = page.close().await {
            tracing::debug!(url = candidate_url, error = %e, "page close failed");
        }
        let mut record = loaded?;

        let identity = PlaceIdentity::from_parts(
            candidate_url,
            record.phone.as_deref(),
            record.name.as_deref(),
            &self.phone_country_code,
        );
        let decision = self
            .dedup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .check_and_record(&identity);
        if let DedupDecision::Duplicate(signal) = decision {
            tracing::debug!(url = candidate_url, ?signal, "duplicate place skipped");
            return Ok(None);
        }

        if let Some(website) = record.website.clone() {
            if cancel.is_cancelled() {
                tracing::debug!(url = candidate_url, "stop requested; skipping enrichment");
            } else {
                let enrichment = self.enricher.enrich(&website).await;
                record.emails = enrichment.emails;
                record.socials = enrichment.socials;
            }
        }

        Ok(Some(record))
    }
}
