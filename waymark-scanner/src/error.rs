use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("a crawl is already in progress for this page")]
    CrawlInProgress,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
