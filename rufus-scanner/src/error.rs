use std::time::Duration;
use thiserror::Error;

/// Failure to load a single page. Recovered per URL by the crawl controller.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Unsupported content type: {0}")]
    UnsupportedContent(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("No page loaded")]
    NotLoaded,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Failure of a classification call. The gateway fails closed on every variant.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure to acquire a resource the whole run depends on.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rendering session unavailable: {0}")]
    Session(String),
}

pub type Result<T> = std::result::Result<T, LoadError>;
