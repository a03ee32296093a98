//! Pool coordinator for bounded concurrent validation
//!
//! Dispatches candidates to the validator under a concurrency cap, collects
//! acceptances into a shared accumulator, and cancels outstanding work once
//! the target count is reached. Already-started probes are never aborted;
//! they finish under their own timeouts and the pool drains them all before
//! returning.

use crate::error::HarvestError;
use crate::proxy::models::{Candidate, ValidationOutcome};
use crate::proxy::validator::Validate;
use futures::future;
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Default number of concurrent validations
const DEFAULT_CONCURRENCY: usize = 15;

/// Default number of accepted candidates to stop at
const DEFAULT_TARGET: usize = 10;

/// Configuration for the validation pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of in-flight validations
    pub concurrency: usize,
    /// Accepted-candidate count at which the run stops early
    pub target: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            target: DEFAULT_TARGET,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_target(mut self, target: usize) -> Self {
        self.target = target;
        self
    }
}

/// Accepted candidates, capped at the target count.
///
/// `try_accept` is the only write path: it checks the cap and appends under
/// one lock, so concurrent acceptances at the boundary cannot overshoot.
struct AcceptedSet {
    target: usize,
    inner: Mutex<Vec<Candidate>>,
}

impl AcceptedSet {
    fn new(target: usize) -> Self {
        Self {
            target,
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Append the candidate if the set is not yet full. Returns whether the
    /// candidate was admitted.
    fn try_accept(&self, candidate: Candidate) -> bool {
        let mut accepted = self.inner.lock();
        if accepted.len() < self.target {
            accepted.push(candidate);
            true
        } else {
            false
        }
    }

    fn is_full(&self) -> bool {
        self.inner.lock().len() >= self.target
    }

    fn snapshot(&self) -> Vec<Candidate> {
        self.inner.lock().clone()
    }
}

/// Validates candidates concurrently until the target count is reached
pub struct ValidationPool<V: Validate + 'static> {
    validator: Arc<V>,
    config: PoolConfig,
}

impl<V: Validate + 'static> ValidationPool<V> {
    /// Create a pool with default configuration
    pub fn new(validator: Arc<V>) -> Self {
        Self::with_config(validator, PoolConfig::default())
    }

    /// Create a pool with custom configuration
    pub fn with_config(validator: Arc<V>, config: PoolConfig) -> Self {
        Self { validator, config }
    }

    /// Validate candidates in source order under the concurrency cap and
    /// return the accepted set, at most `target` long, in completion order.
    pub async fn run(&self, candidates: Vec<Candidate>) -> Result<Vec<Candidate>, HarvestError> {
        if self.config.concurrency == 0 {
            return Err(HarvestError::InvalidConcurrency);
        }

        // Admission gate owned by this run, never shared across runs
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let token = CancellationToken::new();
        let accepted = Arc::new(AcceptedSet::new(self.config.target));

        // Nothing to accept, don't start any probes
        if self.config.target == 0 {
            token.cancel();
        }

        let mut handles = Vec::new();

        for candidate in candidates {
            if token.is_cancelled() {
                break;
            }

            // Semaphore acquire only fails if the semaphore is closed,
            // which won't happen here since we own the Arc and keep it
            // alive for the duration of the run.
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .expect("Semaphore closed unexpectedly");

            let validator = Arc::clone(&self.validator);
            let task_token = token.clone();
            let task_accepted = Arc::clone(&accepted);

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                match validator.validate(&candidate, &task_token).await {
                    ValidationOutcome::Accepted(candidate) => {
                        if task_accepted.try_accept(candidate.clone()) {
                            info!("valid proxy: {}", candidate.url());
                            if task_accepted.is_full() {
                                task_token.cancel();
                            }
                        }
                    }
                    ValidationOutcome::Rejected(reason) => {
                        debug!(
                            "rejected {}: {}",
                            candidate,
                            reason.as_deref().unwrap_or("cancelled")
                        );
                    }
                }
            }));

            if accepted.is_full() {
                token.cancel();
                break;
            }
        }

        // Drain: started validations always run to completion
        future::join_all(handles).await;

        Ok(accepted.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::validator::Validate;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Deterministic validator: accepts candidates from a fixed set and
    /// counts how many probes were actually started.
    struct StubValidator {
        valid: HashSet<String>,
        dispatched: AtomicUsize,
        delay: Option<Duration>,
    }

    impl StubValidator {
        fn accepting(addrs: &[&str]) -> Self {
            Self {
                valid: addrs.iter().map(|s| s.to_string()).collect(),
                dispatched: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn dispatched(&self) -> usize {
            self.dispatched.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Validate for StubValidator {
        async fn validate(
            &self,
            candidate: &Candidate,
            token: &CancellationToken,
        ) -> ValidationOutcome {
            if token.is_cancelled() {
                return ValidationOutcome::Rejected(None);
            }
            self.dispatched.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.valid.contains(&candidate.addr()) {
                ValidationOutcome::Accepted(candidate.clone())
            } else {
                ValidationOutcome::rejected("stub reject")
            }
        }
    }

    fn candidates(addrs: &[&str]) -> Vec<Candidate> {
        addrs
            .iter()
            .map(|addr| {
                let (host, port) = addr.rsplit_once(':').unwrap();
                Candidate::new(host.to_string(), port.parse().unwrap())
            })
            .collect()
    }

    fn addr_set(accepted: &[Candidate]) -> HashSet<String> {
        accepted.iter().map(|c| c.addr()).collect()
    }

    #[test]
    fn test_pool_config_builder() {
        let config = PoolConfig::new().with_concurrency(4).with_target(2);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.target, 2);
    }

    #[test]
    fn test_try_accept_caps_at_target() {
        let set = AcceptedSet::new(2);
        assert!(set.try_accept(Candidate::new("1.1.1.1".to_string(), 80)));
        assert!(!set.is_full());
        assert!(set.try_accept(Candidate::new("2.2.2.2".to_string(), 80)));
        assert!(set.is_full());
        assert!(!set.try_accept(Candidate::new("3.3.3.3".to_string(), 80)));
        assert_eq!(set.snapshot().len(), 2);
    }

    #[test]
    fn test_try_accept_zero_target() {
        let set = AcceptedSet::new(0);
        assert!(set.is_full());
        assert!(!set.try_accept(Candidate::new("1.1.1.1".to_string(), 80)));
        assert!(set.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let validator = Arc::new(StubValidator::accepting(&[]));
        let pool = ValidationPool::new(Arc::clone(&validator));

        let accepted = pool.run(Vec::new()).await.unwrap();
        assert!(accepted.is_empty());
        assert_eq!(validator.dispatched(), 0);
    }

    #[tokio::test]
    async fn test_zero_target_dispatches_nothing() {
        let validator = Arc::new(StubValidator::accepting(&["1.1.1.1:80"]));
        let pool = ValidationPool::with_config(
            Arc::clone(&validator),
            PoolConfig::new().with_target(0),
        );

        let accepted = pool.run(candidates(&["1.1.1.1:80", "2.2.2.2:80"])).await.unwrap();
        assert!(accepted.is_empty());
        assert_eq!(validator.dispatched(), 0);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_config_error() {
        let validator = Arc::new(StubValidator::accepting(&[]));
        let pool = ValidationPool::with_config(
            Arc::clone(&validator),
            PoolConfig::new().with_concurrency(0),
        );

        let result = pool.run(candidates(&["1.1.1.1:80"])).await;
        assert!(matches!(result, Err(HarvestError::InvalidConcurrency)));
        assert_eq!(validator.dispatched(), 0);
    }

    #[tokio::test]
    async fn test_accepts_only_valid_candidates() {
        let validator = Arc::new(StubValidator::accepting(&["1.1.1.1:80", "3.3.3.3:80"]));
        let pool = ValidationPool::with_config(
            Arc::clone(&validator),
            PoolConfig::new().with_concurrency(3).with_target(2),
        );

        let input = candidates(&["1.1.1.1:80", "2.2.2.2:80", "3.3.3.3:80"]);
        let accepted = pool.run(input).await.unwrap();

        assert_eq!(
            addr_set(&accepted),
            HashSet::from(["1.1.1.1:80".to_string(), "3.3.3.3:80".to_string()])
        );
    }

    #[tokio::test]
    async fn test_accepted_never_exceeds_target() {
        let all: Vec<String> = (0..40).map(|i| format!("10.0.0.{}:80", i)).collect();
        let all_refs: Vec<&str> = all.iter().map(|s| s.as_str()).collect();

        let validator = Arc::new(StubValidator::accepting(&all_refs));
        let pool = ValidationPool::with_config(
            Arc::clone(&validator),
            PoolConfig::new().with_concurrency(8).with_target(5),
        );

        let accepted = pool.run(candidates(&all_refs)).await.unwrap();
        assert_eq!(accepted.len(), 5);

        // Unique, and all drawn from the input
        let set = addr_set(&accepted);
        assert_eq!(set.len(), 5);
        assert!(set.iter().all(|addr| all.contains(addr)));
    }

    #[tokio::test]
    async fn test_membership_independent_of_concurrency() {
        let input: Vec<String> = (0..20).map(|i| format!("10.0.1.{}:80", i)).collect();
        let input_refs: Vec<&str> = input.iter().map(|s| s.as_str()).collect();
        // Every third candidate is valid; target above the valid count so
        // early stopping never races membership
        let valid: Vec<&str> = input_refs.iter().step_by(3).copied().collect();

        let mut memberships = Vec::new();
        for concurrency in [1, 8] {
            let validator = Arc::new(StubValidator::accepting(&valid));
            let pool = ValidationPool::with_config(
                validator,
                PoolConfig::new().with_concurrency(concurrency).with_target(10),
            );
            let accepted = pool.run(candidates(&input_refs)).await.unwrap();
            memberships.push(addr_set(&accepted));
        }

        assert_eq!(memberships[0], memberships[1]);
        assert_eq!(memberships[0].len(), valid.len());
    }

    #[tokio::test]
    async fn test_early_stop_suppresses_dispatch() {
        let all: Vec<String> = (0..100).map(|i| format!("10.0.2.{}:80", i % 256)).collect();
        let all_refs: Vec<&str> = all.iter().map(|s| s.as_str()).collect();

        let concurrency = 2;
        let target = 3;
        let validator = Arc::new(
            StubValidator::accepting(&all_refs).with_delay(Duration::from_millis(10)),
        );
        let pool = ValidationPool::with_config(
            Arc::clone(&validator),
            PoolConfig::new().with_concurrency(concurrency).with_target(target),
        );

        let accepted = pool.run(candidates(&all_refs)).await.unwrap();
        assert_eq!(accepted.len(), target);

        // Dispatch stops once the target is reached: bounded by the point of
        // the last accept plus the in-flight window, nowhere near the full list
        assert!(
            validator.dispatched() <= target + concurrency + 1,
            "dispatched {} probes",
            validator.dispatched()
        );
    }

    #[tokio::test]
    async fn test_all_rejected_yields_empty_set() {
        let validator = Arc::new(StubValidator::accepting(&[]));
        let pool = ValidationPool::with_config(
            Arc::clone(&validator),
            PoolConfig::new().with_concurrency(4).with_target(5),
        );

        let input: Vec<String> = (0..10).map(|i| format!("10.0.3.{}:80", i)).collect();
        let input_refs: Vec<&str> = input.iter().map(|s| s.as_str()).collect();

        let accepted = pool.run(candidates(&input_refs)).await.unwrap();
        assert!(accepted.is_empty());
        // No early stop, so everything was probed
        assert_eq!(validator.dispatched(), 10);
    }
}
