//! Picks contact and about pages out of a homepage.

use std::collections::HashSet;
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::Url;

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a>").expect("valid regex"));
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bhref\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// Link text or path fragments that mark a contact or about page, including
/// Arabic, German, and Spanish equivalents.
const CONTACT_KEYWORDS: &[&str] = &[
    "contact",
    "about",
    "اتصل",
    "تواصل",
    "من نحن",
    "kontakt",
    "contacto",
    "impressum",
];

const SKIPPED_SCHEMES: &[&str] = &["mailto:", "tel:", "javascript:", "#"];

/// Returns up to `limit` absolute contact/about URLs found in `html`, in
/// document order, excluding the page itself.
#[must_use]
pub fn select_contact_links(base: &Url, html: &str, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    seen.insert(without_fragment(base));

    let mut links = Vec::new();
    for caps in ANCHOR_RE.captures_iter(html) {
        if links.len() >= limit {
            break;
        }
        let Some(href) = extract_href(&caps[1]) else {
            continue;
        };
        let lowered = href.to_lowercase();
        if SKIPPED_SCHEMES.iter().any(|s| lowered.starts_with(s)) {
            continue;
        }
        let text = TAG_RE.replace_all(&caps[2], " ").to_lowercase();
        let decoded_href = percent_decode_str(&lowered).decode_utf8_lossy().to_string();
        if !is_contact_like(&decoded_href) && !is_contact_like(&text) {
            continue;
        }
        let Some(url) = absolutize_url(base, &href) else {
            continue;
        };
        if seen.insert(without_fragment(&url)) {
            links.push(url.to_string());
        }
    }
    links
}

fn is_contact_like(haystack: &str) -> bool {
    CONTACT_KEYWORDS.iter().any(|k| haystack.contains(k))
}

fn extract_href(attrs: &str) -> Option<String> {
    HREF_RE
        .captures(attrs)
        .and_then(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|h| !h.is_empty())
}

fn absolutize_url(base: &Url, candidate: &str) -> Option<Url> {
    let candidate = candidate.replace("&amp;", "&");
    let url = base.join(&candidate).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn without_fragment(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}
