use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid regex")
});

/// Placeholder, template, and tracking domains that never belong to the
/// business itself.
const DENIED_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "domain.com",
    "email.com",
    "yourdomain.com",
    "sentry.io",
    "wixpress.com",
];

const DENIED_LOCAL_PARTS: &[&str] = &[
    "noreply",
    "no-reply",
    "donotreply",
    "do-not-reply",
    "mailer-daemon",
];

/// Asset filenames such as `logo@2x.png` match the address pattern.
const ASSET_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".css", ".js",
];

const MIN_LOCAL_PART_LEN: usize = 2;

/// Pulls contact addresses out of raw page content.
///
/// Addresses are lower-cased and returned in first-seen order without
/// duplicates; denylisted and implausible ones are dropped.
#[must_use]
pub fn extract_emails(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    EMAIL_RE
        .find_iter(text)
        .filter_map(|m| clean_email(m.as_str()))
        .filter(|email| seen.insert(email.clone()))
        .collect()
}

fn clean_email(raw: &str) -> Option<String> {
    // Percent-encoded spaces from `mailto:%20info@...` links.
    let email = raw
        .trim_start_matches("%20")
        .trim_matches('.')
        .to_ascii_lowercase();
    let (local, domain) = email.split_once('@')?;

    if local.len() < MIN_LOCAL_PART_LEN {
        return None;
    }
    if DENIED_LOCAL_PARTS.contains(&local) {
        return None;
    }
    let denied_domain = DENIED_DOMAINS
        .iter()
        .any(|d| domain == *d || domain.ends_with(&format!(".{d}")));
    if denied_domain {
        return None;
    }
    if ASSET_SUFFIXES.iter().any(|s| domain.ends_with(s)) {
        return None;
    }
    Some(email)
}
