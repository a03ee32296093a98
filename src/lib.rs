//! Proxy Harvest - Open Proxy Scraper and Validator
//!
//! Fetches proxy candidates from a scrape source and validates them
//! concurrently by probing through each one, stopping once a target
//! number of working proxies has been found.

pub mod error;
pub mod proxy;

pub use error::{HarvestError, SourceError};
pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
