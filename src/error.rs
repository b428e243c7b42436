//! Typed errors for the pipeline components.

use std::time::Duration;

use thiserror::Error;

/// Contact reveal could not be determined (the `Failed` terminal state).
///
/// Distinct from a confirmed hidden number, which is not an error.
#[derive(Debug, Error)]
pub enum RevealError {
    #[error("contact button did not appear: {0}")]
    ControlMissing(String),

    #[error("clicking the contact button failed: {0}")]
    Click(String),

    #[error("neither phone link nor hidden notice appeared within {0:?}")]
    Unresolved(Duration),

    #[error("reading the page failed while waiting for contact info: {0}")]
    Page(String),
}

/// Failure while processing a single candidate
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not open ad page {url}: {message}")]
    Open { url: String, message: String },

    #[error("could not derive an ad id from {0}")]
    InvalidUrl(String),

    #[error("ad content did not load: {0}")]
    ContentMissing(String),

    #[error(transparent)]
    Reveal(#[from] RevealError),

    #[error("phone link disappeared before extraction")]
    MissingPhone,

    #[error("could not read the rendered document: {0}")]
    Document(String),

    #[error("hidden-phone ad could not be blacklisted: {0}")]
    Blacklist(#[from] BlacklistError),
}

#[derive(Debug, Error)]
pub enum BlacklistError {
    #[error("blacklist I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blacklist file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("collector request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("collector rejected the ad with status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Error)]
pub enum KnownIdsError {
    #[error("known-ids request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("known-ids source answered {0}")]
    Status(reqwest::StatusCode),

    #[error("known-ids body is neither an array nor {{data: [...]}}")]
    Malformed,
}
