//! Integration tests for `ContactEnricher::enrich`.
//!
//! Each test stands up a `wiremock` server playing the business website, so
//! no real network traffic is made. Covers homepage hits, the contact/about
//! follow-up crawl, and the failure modes that must collapse to an empty
//! result.

use std::time::Duration;

use mapscout_core::SessionConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mapscout_scraper::{ContactEnricher, Enrichment};

fn test_enricher() -> ContactEnricher {
    let config = SessionConfig {
        enrich_timeout_secs: 1,
        enrich_secondary_timeout_secs: 1,
        max_socials: 3,
        ..SessionConfig::default()
    };
    ContactEnricher::new(&config).expect("failed to build test ContactEnricher")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!("<html><body>{body}</body></html>"))
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Homepage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn homepage_email_skips_secondary_pages() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(r#"<p>info@alnoor.sa</p><a href="/contact">Contact</a>"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/contact"))
        .respond_with(html("sales@alnoor.sa"))
        .expect(0)
        .mount(&server)
        .await;

    let result = test_enricher().enrich(&format!("{}/", server.uri())).await;

    assert_eq!(result.emails, vec!["info@alnoor.sa"]);
}

#[tokio::test]
async fn placeholder_addresses_are_filtered() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html("info@example.com noreply@alnoor.sa sales@realsite.sa"),
    )
    .await;

    let result = test_enricher().enrich(&server.uri()).await;

    assert_eq!(result.emails, vec!["sales@realsite.sa"]);
}

// ---------------------------------------------------------------------------
// Secondary pages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn contact_page_is_visited_when_homepage_has_no_email() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(r#"<a href="/pages/contact-us">Contact us</a><a href="/about">About</a>"#),
    )
    .await;
    mount(&server, "/pages/contact-us", html("hello@alnoor.sa")).await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("team@alnoor.sa"))
        .expect(0)
        .mount(&server)
        .await;

    let result = test_enricher().enrich(&server.uri()).await;

    assert_eq!(result.emails, vec!["hello@alnoor.sa"]);
}

#[tokio::test]
async fn failing_contact_page_falls_through_to_the_next() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(r#"<a href="/contact">Contact</a><a href="/about">من نحن</a>"#),
    )
    .await;
    mount(&server, "/contact", ResponseTemplate::new(404)).await;
    mount(&server, "/about", html("care@alnoor.sa")).await;

    let result = test_enricher().enrich(&server.uri()).await;

    assert_eq!(result.emails, vec!["care@alnoor.sa"]);
}

#[tokio::test]
async fn at_most_two_secondary_pages_are_visited() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(
            r#"<a href="/contact">Contact</a><a href="/about">About</a><a href="/kontakt">Kontakt</a>"#,
        ),
    )
    .await;
    mount(&server, "/contact", html("nothing here")).await;
    mount(&server, "/about", html("nothing here either")).await;
    Mock::given(method("GET"))
        .and(path("/kontakt"))
        .respond_with(html("late@alnoor.sa"))
        .expect(0)
        .mount(&server)
        .await;

    let result = test_enricher().enrich(&server.uri()).await;

    assert!(result.emails.is_empty());
}

// ---------------------------------------------------------------------------
// Socials
// ---------------------------------------------------------------------------

#[tokio::test]
async fn socials_are_collected_across_pages_and_capped() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(
            r#"<a href="https://www.instagram.com/alnoor">ig</a>
               <a href="https://www.facebook.com/sharer/sharer.php?u=x">share</a>
               <a href="/contact">Contact</a>"#,
        ),
    )
    .await;
    mount(
        &server,
        "/contact",
        html(
            r#"<a href="https://www.facebook.com/alnoor">fb</a>
               <a href="https://x.com/alnoor">x</a>
               <a href="https://www.tiktok.com/@alnoor">tt</a>"#,
        ),
    )
    .await;

    let result = test_enricher().enrich(&server.uri()).await;

    assert_eq!(
        result.socials,
        vec![
            "https://www.facebook.com/alnoor",
            "https://www.instagram.com/alnoor",
            "https://x.com/alnoor",
        ]
    );
}

// ---------------------------------------------------------------------------
// Absorbed failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn server_error_yields_empty_enrichment() {
    let server = MockServer::start().await;
    mount(&server, "/", ResponseTemplate::new(500)).await;

    let result = test_enricher().enrich(&server.uri()).await;

    assert_eq!(result, Enrichment::default());
}

#[tokio::test]
async fn slow_homepage_times_out_to_empty_enrichment() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html("info@alnoor.sa").set_delay(Duration::from_secs(3)),
    )
    .await;

    let result = test_enricher().enrich(&server.uri()).await;

    assert!(result.is_empty());
}

#[tokio::test]
async fn bot_challenge_page_yields_empty_enrichment() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html("<title>Just a moment...</title> Please enable cookies. ops@alnoor.sa"),
    )
    .await;

    let result = test_enricher().enrich(&server.uri()).await;

    assert!(result.is_empty());
}

#[tokio::test]
async fn unparseable_website_yields_empty_enrichment() {
    let enricher = test_enricher();
    assert!(enricher.enrich("not a url").await.is_empty());
    assert!(enricher.enrich("ftp://files.alnoor.sa/").await.is_empty());
}
