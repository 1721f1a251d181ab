//! Secondary crawl of a business's own website for contact details.

mod emails;
mod fetch;
mod links;
mod socials;

use std::time::Duration;

use mapscout_core::SessionConfig;
use reqwest::{Client, Url};

use crate::error::ScoutError;

pub use emails::extract_emails;
pub use links::select_contact_links;
pub use socials::{extract_socials, SocialPlatform};

/// Contact and about pages visited when the homepage has no email.
const MAX_SECONDARY_PAGES: usize = 2;

/// Emails and social links found on a website. Empty when nothing was found
/// or the site could not be crawled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub emails: Vec<String>,
    pub socials: Vec<String>,
}

impl Enrichment {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.socials.is_empty()
    }
}

/// Crawls business websites over plain HTTP. Every fetch carries its own
/// deadline, shorter than listing navigation.
#[derive(Debug, Clone)]
pub struct ContactEnricher {
    client: Client,
    homepage_timeout: Duration,
    secondary_timeout: Duration,
    max_socials: usize,
}

impl ContactEnricher {
    /// # Errors
    ///
    /// Returns [`ScoutError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: &SessionConfig) -> Result<Self, ScoutError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.enrich_secondary_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            homepage_timeout: Duration::from_secs(config.enrich_timeout_secs),
            secondary_timeout: Duration::from_secs(config.enrich_secondary_timeout_secs),
            max_socials: config.max_socials,
        })
    }

    /// Crawls `website` and returns whatever contact details it exposes.
    ///
    /// Never fails: every error is logged and yields an empty result.
    pub async fn enrich(&self, website: &str) -> Enrichment {
        match self.try_enrich(website).await {
            Ok(enrichment) => {
                tracing::debug!(
                    website,
                    emails = enrichment.emails.len(),
                    socials = enrichment.socials.len(),
                    "enrichment complete"
                );
                enrichment
            }
            Err(e) => {
                tracing::debug!(website, error = %e, "enrichment failed");
                Enrichment::default()
            }
        }
    }

    async fn try_enrich(&self, website: &str) -> Result<Enrichment, ScoutError> {
        let start = Url::parse(website.trim()).map_err(|e| ScoutError::Enrichment {
            url: website.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(start.scheme(), "http" | "https") {
            return Err(ScoutError::Enrichment {
                url: website.to_string(),
                reason: format!("unsupported scheme {}", start.scheme()),
            });
        }

        let home = fetch::fetch_html(&self.client, start.as_str(), self.homepage_timeout).await?;
        let mut emails = extract_emails(&home.body);
        let mut contents = vec![home.body.clone()];

        if emails.is_empty() {
            for link in select_contact_links(&home.url, &home.body, MAX_SECONDARY_PAGES) {
                match fetch::fetch_html(&self.client, &link, self.secondary_timeout).await {
                    Ok(page) => {
                        for email in extract_emails(&page.body) {
                            if !emails.contains(&email) {
                                emails.push(email);
                            }
                        }
                        contents.push(page.body);
                    }
                    Err(e) => {
                        tracing::debug!(url = %link, error = %e, "secondary page fetch failed");
                    }
                }
                if !emails.is_empty() {
                    break;
                }
            }
        }

        Ok(Enrichment {
            emails,
            socials: extract_socials(&contents, self.max_socials),
        })
    }
}
