//! Error types for proxy harvesting

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors fetching the candidate list from a scrape source.
///
/// Any of these is fatal to the run: no candidates proceed to validation.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to build source request: {0}")]
    Config(#[source] reqwest::Error),
    #[error("failed to connect to proxy source: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("failed to read proxy source response: {0}")]
    Read(#[source] reqwest::Error),
}

/// Top-level error for a harvest run
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("unknown scrape source: {0}")]
    UnknownSource(String),

    #[error("concurrency limit must be greater than zero")]
    InvalidConcurrency,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("failed to write output file {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
