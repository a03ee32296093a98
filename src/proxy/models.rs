//! Candidate and validation outcome models

use serde::{Deserialize, Serialize};
use std::fmt;

/// An unvalidated proxy endpoint in `host:port` form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub host: String,
    pub port: u16,
}

impl Candidate {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    /// Get the endpoint in `host:port` form
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the endpoint as a fully-qualified HTTP proxy URL
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr())
    }
}

/// Result of validating a single candidate
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    /// The candidate forwarded the probe request
    Accepted(Candidate),
    /// The candidate failed the probe, with an optional diagnostic
    Rejected(Option<String>),
}

impl ValidationOutcome {
    pub fn rejected(reason: impl Into<String>) -> Self {
        ValidationOutcome::Rejected(Some(reason.into()))
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted(_))
    }
}
