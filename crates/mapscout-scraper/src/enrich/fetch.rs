//! Low-level HTTP helper for the enrichment crawl.

use std::time::Duration;

use reqwest::Url;

use crate::error::ScoutError;

/// A fetched HTML document and the URL it was finally served from.
#[derive(Debug, Clone)]
pub(crate) struct FetchedPage {
    pub url: Url,
    pub body: String,
}

/// GETs `url` once with a hard `timeout`. Non-2xx responses and bot
/// challenge pages are errors.
pub(crate) async fn fetch_html(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<FetchedPage, ScoutError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(ScoutError::UnexpectedStatus {
            status: response.status().as_u16(),
            url: url.to_owned(),
        });
    }
    let final_url = response.url().clone();
    let body = response.text().await?;

    if looks_like_bot_challenge(&body) {
        return Err(ScoutError::Enrichment {
            url: url.to_owned(),
            reason: "bot challenge page".to_string(),
        });
    }
    Ok(FetchedPage {
        url: final_url,
        body,
    })
}

fn looks_like_bot_challenge(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    let has_cloudflare_banner = lowered.contains("attention required! | cloudflare");
    let has_challenge_platform = lowered.contains("/cdn-cgi/challenge-platform/");
    let has_just_a_moment = lowered.contains("just a moment...");
    let has_cookie_gate = lowered.contains("please enable cookies");

    has_cloudflare_banner || has_challenge_platform || (has_just_a_moment && has_cookie_gate)
}
