use thiserror::Error;

/// Failures raised by a [`crate::browser::Browser`] backend.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("failed to open page: {0}")]
    OpenPage(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("page is closed")]
    Closed,
}

/// Pipeline-level error taxonomy.
///
/// Only [`ScoutError::Session`] is meant to reach the session observer; every
/// other variant is absorbed by the component that raised it.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("navigation to {url} timed out after {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("no locator strategy produced a value for field {field}")]
    SelectorExhaustion { field: &'static str },

    #[error("no results container matched any locator")]
    ContainerNotFound,

    #[error("enrichment of {url} failed: {reason}")]
    Enrichment { url: String, reason: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("session failed: {0}")]
    Session(String),
}
