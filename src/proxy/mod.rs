//! Proxy module for discovering and validating open proxies
//!
//! This module provides functionality for:
//! - Fetching proxy candidates from named scrape sources
//! - Validating candidates by probing through them as forward proxies
//! - Coordinating bounded concurrent validation with early stopping
//! - Persisting accepted proxies to a file

pub mod models;
pub mod pool;
pub mod sink;
pub mod source;
pub mod validator;

pub use models::{Candidate, ValidationOutcome};
pub use pool::{PoolConfig, ValidationPool};
pub use sink::persist;
pub use source::{CandidateSource, ScrapeSource, SourceConfig, SCRAPE_SOURCES};
pub use validator::{Validate, Validator, ValidatorConfig};
