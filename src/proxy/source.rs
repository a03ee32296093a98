//! Candidate source module for fetching proxy candidates from scrape providers
//!
//! This module provides functionality for:
//! - A registry of named scrape sources
//! - Fetching a provider's response body over HTTP
//! - Extracting `IP:PORT` candidates from raw text

use crate::error::SourceError;
use crate::proxy::models::Candidate;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;

/// Default timeout for source fetches in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Regex pattern to match IP:PORT patterns in text
static IP_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(\d{1,5})\b").expect("Invalid IP:PORT regex")
});

/// A named scrape source providing proxy candidate lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeSource {
    /// Name the source is selected by on the command line
    pub name: &'static str,
    /// URL to fetch the candidate list from
    pub url: &'static str,
}

/// Built-in scrape sources. All of them can be harvested with the plain
/// IP:PORT extraction, no provider-specific parsing needed.
pub const SCRAPE_SOURCES: &[ScrapeSource] = &[
    ScrapeSource {
        name: "proxyscrape",
        url: "https://api.proxyscrape.com/v2/?request=getproxies&protocol=http&timeout=10000&country=all&ssl=all&anonymity=all",
    },
    ScrapeSource {
        name: "sslproxies",
        url: "https://sslproxies.org",
    },
    ScrapeSource {
        name: "freeproxylist",
        url: "https://free-proxy-list.net",
    },
];

impl ScrapeSource {
    /// Look up a scrape source by name
    pub fn lookup(name: &str) -> Option<&'static ScrapeSource> {
        SCRAPE_SOURCES.iter().find(|s| s.name == name)
    }

    /// Names of all built-in sources, for error messages
    pub fn names() -> Vec<&'static str> {
        SCRAPE_SOURCES.iter().map(|s| s.name).collect()
    }
}

/// Configuration for the candidate source client
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Timeout for the fetch request
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Fetches candidate lists from scrape sources
pub struct CandidateSource {
    client: Client,
}

impl CandidateSource {
    /// Create a candidate source with default configuration
    pub fn new() -> Result<Self, SourceError> {
        Self::with_config(SourceConfig::default())
    }

    /// Create a candidate source with custom configuration
    pub fn with_config(config: SourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(SourceError::Config)?;

        Ok(Self { client })
    }

    /// Fetch a provider's response body and extract candidates from it
    pub async fn fetch(&self, url: &str) -> Result<Vec<Candidate>, SourceError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5")
            .header("Connection", "keep-alive")
            .send()
            .await
            .map_err(SourceError::Connect)?;

        let content = response.text().await.map_err(SourceError::Read)?;
        Ok(extract_candidates(&content))
    }
}

/// Extract `IP:PORT` candidates from raw text content.
///
/// Matches IPv4 dotted-quad addresses with a port, rejects out-of-range
/// octets and port 0, and deduplicates preserving first-seen order.
pub fn extract_candidates(content: &str) -> Vec<Candidate> {
    let mut seen = HashSet::new();

    IP_PORT_REGEX
        .captures_iter(content)
        .filter_map(|cap| {
            let host = cap.get(1)?.as_str();
            let port: u16 = cap.get(2)?.as_str().parse().ok()?;

            for part in host.split('.') {
                let octet: u32 = part.parse().ok()?;
                if octet > 255 {
                    return None;
                }
            }

            if port == 0 {
                return None;
            }

            let candidate = Candidate::new(host.to_string(), port);
            seen.insert(candidate.clone()).then_some(candidate)
        })
        .collect()
}
