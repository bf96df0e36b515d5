use std::time::Duration;

use thiserror::Error;

/// A single failed page fetch. Always retried by the pipeline before the URL is abandoned.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("spider request failed: {0}")]
    Spider(String),

    #[error("empty page returned for {0}")]
    Empty(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Persistence failure. Surfaced to the caller: a record that was fully
/// assembled could not be saved.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store connection lock poisoned")]
    Poisoned,
}
