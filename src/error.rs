//! Error taxonomy for the scraping pipeline.
//!
//! Per-story failures ([`FetchError`], [`ExtractionError`]) are logged and
//! skipped by the pipeline. Listing failures on the first page and output
//! failures are fatal and surface as [`RunError`].

use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A single HTTP GET failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS, timeout or body read failure.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Request { .. } => true,
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }
}

/// A listing page could not be fetched or decoded.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("could not build listing URL from {base}: {source}")]
    Url {
        base: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("listing page {url} is not a story listing: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A story page does not match the expected story layout.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no <article> element on {url}")]
    MissingArticle { url: String },
    #[error("no story text inside the <article> of {url}")]
    EmptyBody { url: String },
}

/// The dataset could not be written.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize dataset as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to serialize dataset as CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Settings could not be loaded or are invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A failure that aborts the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("story listing unavailable: {0}")]
    Listing(#[from] ListingError),
    #[error(transparent)]
    Output(#[from] OutputError),
}
