//! Session-scoped identity tracking for extracted places.
//!
//! A place is identified by three independent signals: a token derived from
//! its listing URL, its normalized phone, and its normalized name. A match on
//! any single signal marks the place as a duplicate. Branches of a chain
//! that share a name collapse into one record, and the same business listed
//! under two spellings without a phone is kept twice.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static FEATURE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!1s(0x[a-f0-9:]+)").expect("valid regex"));
static PLACE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"place_id:([A-Za-z0-9_-]+)").expect("valid regex"));

/// Normalized phones shorter than this are too ambiguous to dedup on.
const MIN_PHONE_DIGITS: usize = 8;
/// Normalized names must be longer than this to dedup on.
const MIN_NAME_CHARS: usize = 3;

/// Canonical token for a listing URL: the embedded feature ID or `place_id`
/// when present, otherwise the trimmed URL itself.
#[must_use]
pub fn url_token(url: &str) -> String {
    if let Some(caps) = FEATURE_ID_RE.captures(url) {
        return caps[1].to_string();
    }
    if let Some(caps) = PLACE_ID_RE.captures(url) {
        return caps[1].to_string();
    }
    url.trim().to_string()
}

/// Folds a display phone to its national significant digits.
///
/// Keeps digits and `+`, drops a leading `+` or `00` international prefix,
/// then the `country_code` dial prefix, then any trunk `0`. Returns `None`
/// when fewer than eight digits remain.
#[must_use]
pub fn normalize_phone(raw: &str, country_code: &str) -> Option<String> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    let mut digits = kept.trim_start_matches('+');
    if let Some(rest) = digits.strip_prefix("00") {
        digits = rest;
    }
    if !country_code.is_empty() {
        if let Some(rest) = digits.strip_prefix(country_code) {
            digits = rest;
        }
    }
    let digits: String = digits
        .trim_start_matches('0')
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    (digits.len() >= MIN_PHONE_DIGITS).then_some(digits)
}

/// Lower-cases, strips punctuation, and collapses whitespace. Returns `None`
/// for names of three characters or fewer.
#[must_use]
pub fn normalize_name(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    (collapsed.chars().count() > MIN_NAME_CHARS).then_some(collapsed)
}

/// The three dedup signals for one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceIdentity {
    pub url_token: String,
    pub phone: Option<String>,
    pub name: Option<String>,
}

impl PlaceIdentity {
    #[must_use]
    pub fn from_parts(
        source_url: &str,
        phone: Option<&str>,
        name: Option<&str>,
        country_code: &str,
    ) -> Self {
        Self {
            url_token: url_token(source_url),
            phone: phone.and_then(|p| normalize_phone(p, country_code)),
            name: name.and_then(normalize_name),
        }
    }
}

/// Which signal caused a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateSignal {
    UrlToken,
    Phone,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    Accepted,
    Duplicate(DuplicateSignal),
}

impl DedupDecision {
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, DedupDecision::Accepted)
    }
}

/// Seen-sets for one session. Grows monotonically; never shared between
/// sessions.
#[derive(Debug, Default)]
pub struct DedupIndex {
    url_tokens: HashSet<String>,
    phones: HashSet<String>,
    names: HashSet<String>,
}

impl DedupIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides whether `identity` is new and, if so, records every signal it
    /// carries before returning.
    ///
    /// Takes `&mut self` and never suspends, so callers sharing the index
    /// behind a mutex get check-and-record as one atomic step.
    pub fn check_and_record(&mut self, identity: &PlaceIdentity) -> DedupDecision {
        if self.url_tokens.contains(&identity.url_token) {
            return DedupDecision::Duplicate(DuplicateSignal::UrlToken);
        }
        if identity
            .phone
            .as_ref()
            .is_some_and(|p| self.phones.contains(p))
        {
            return DedupDecision::Duplicate(DuplicateSignal::Phone);
        }
        if identity
            .name
            .as_ref()
            .is_some_and(|n| self.names.contains(n))
        {
            return DedupDecision::Duplicate(DuplicateSignal::Name);
        }

        self.url_tokens.insert(identity.url_token.clone());
        if let Some(phone) = &identity.phone {
            self.phones.insert(phone.clone());
        }
        if let Some(name) = &identity.name {
            self.names.insert(name.clone());
        }
        DedupDecision::Accepted
    }

    /// Number of accepted places.
    #[must_use]
    pub fn len(&self) -> usize {
        self.url_tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url_tokens.is_empty()
    }
}
