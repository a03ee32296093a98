//! Validator module for probing proxy candidates
//!
//! A candidate is accepted when it demonstrably forwards traffic: either the
//! probe target answers with a success status, or the transport reports a
//! pattern known to be the probe target's own abuse mitigation (redirect loop
//! exhaustion, a blocked/verification page) rather than a proxy failure.

use crate::proxy::models::{Candidate, ValidationOutcome};
use async_trait::async_trait;
use reqwest::{redirect, Client, Proxy};
use std::error::Error as _;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default URL to probe through each candidate
const DEFAULT_PROBE_URL: &str = "https://google.com/";

/// Default connection establishment timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;

/// Default TCP keep-alive interval in seconds
const DEFAULT_KEEPALIVE_SECS: u64 = 1;

/// Default overall per-attempt timeout in seconds
const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 10;

/// Redirect limit for the probe request
const MAX_REDIRECTS: usize = 10;

/// Default blocked/verification signature of the default probe target
const DEFAULT_BLOCKED_SIGNATURE: &str = "https://www.google.com/sorry/";

/// Default user agent for probe requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Validation seam, so the pool can be exercised with a deterministic stub
#[async_trait]
pub trait Validate: Send + Sync {
    /// Probe one candidate. Network failures are an expected outcome and map
    /// to `Rejected`, never to an error.
    async fn validate(&self, candidate: &Candidate, token: &CancellationToken) -> ValidationOutcome;
}

/// Configuration for the validator
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// URL to probe through each candidate
    pub probe_url: String,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// TCP keep-alive interval
    pub keepalive: Duration,
    /// Overall timeout for one probe attempt
    pub attempt_timeout: Duration,
    /// Substrings of the probe target's blocked/verification responses that
    /// still count as evidence of a forwarding proxy
    pub blocked_signatures: Vec<String>,
    /// User agent for probe requests
    pub user_agent: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            probe_url: DEFAULT_PROBE_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            keepalive: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            attempt_timeout: Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS),
            blocked_signatures: vec![DEFAULT_BLOCKED_SIGNATURE.to_string()],
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe_url(mut self, url: String) -> Self {
        self.probe_url = url;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_blocked_signatures(mut self, signatures: Vec<String>) -> Self {
        self.blocked_signatures = signatures;
        self
    }
}

/// Probes candidates by routing one request through each as a forward proxy
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    /// Create a validator with default configuration
    pub fn new() -> Self {
        Self::with_config(ValidatorConfig::default())
    }

    /// Create a validator with custom configuration
    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Create a reqwest client routing through the candidate
    fn build_client(&self, candidate: &Candidate) -> Result<Client, reqwest::Error> {
        Client::builder()
            .proxy(Proxy::all(candidate.url())?)
            .connect_timeout(self.config.connect_timeout)
            .tcp_keepalive(Some(self.config.keepalive))
            .timeout(self.config.attempt_timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(&self.config.user_agent)
            .build()
    }

    fn matches_blocked_signature(&self, text: &str) -> bool {
        self.config
            .blocked_signatures
            .iter()
            .any(|sig| text.contains(sig.as_str()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Validate for Validator {
    async fn validate(&self, candidate: &Candidate, token: &CancellationToken) -> ValidationOutcome {
        // Target already met, skip the probe entirely
        if token.is_cancelled() {
            return ValidationOutcome::Rejected(None);
        }

        let client = match self.build_client(candidate) {
            Ok(client) => client,
            Err(e) => return ValidationOutcome::rejected(e.to_string()),
        };

        let request = client
            .get(&self.config.probe_url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5");

        match request.send().await {
            Ok(response) => {
                if response.status().is_success() {
                    ValidationOutcome::Accepted(candidate.clone())
                } else if self.matches_blocked_signature(response.url().as_str()) {
                    // The probe target blocked the proxy's address, which
                    // still proves the proxy forwarded the request
                    ValidationOutcome::Accepted(candidate.clone())
                } else {
                    ValidationOutcome::rejected(format!("probe status {}", response.status()))
                }
            }
            Err(e) => {
                if e.is_redirect() || self.matches_blocked_signature(&error_text(&e)) {
                    ValidationOutcome::Accepted(candidate.clone())
                } else {
                    ValidationOutcome::rejected(e.to_string())
                }
            }
        }
    }
}

/// Flatten an error and its source chain into one searchable string
fn error_text(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}
