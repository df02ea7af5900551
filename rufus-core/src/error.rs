use rufus_scanner::SetupError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a crawl before traversal starts.
///
/// Everything that goes wrong during traversal is contained per page or per
/// link and never surfaces here.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Setup failed: {0}")]
    Setup(#[from] SetupError),
}

#[derive(Error, Debug)]
pub enum ReportWriteError {
    #[error("Failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("No free report file name in {0}")]
    NameExhausted(PathBuf),
}
