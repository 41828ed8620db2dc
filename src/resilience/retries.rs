//! Retrying fetch.
//!
//! # Responsibilities
//! - Decide, as a pure function of (attempt, outcome), whether to try again
//! - Execute at most `max_attempts` (≤ 2) attempts with linear backoff
//! - Hand the final outcome back untouched
//!
//! Only timeouts, 429 and 503 are retried. 401/403 is returned at once so the
//! caller can drop its credential. Non-idempotent requests bypass this layer
//! and make a single bounded attempt.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::{calculate_backoff, Sleeper, TokioSleeper};
use crate::resilience::timeouts::{FetchOutcome, FetchRequest, HttpTransport};

/// Hard ceiling on attempts per call.
pub const MAX_ATTEMPTS: u32 = 2;

/// What to do after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `after`, then issue the next attempt.
    Retry { after: Duration },
    /// Return this outcome to the caller.
    Finish,
}

/// Retry policy: attempt budget plus backoff unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS),
            backoff_base_ms,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.backoff_base_ms)
    }

    /// Never retry.
    pub fn none() -> Self {
        Self::new(1, 0)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide what follows attempt number `attempt` (1-based).
    pub fn decide(&self, attempt: u32, outcome: &FetchOutcome) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::Finish;
        }
        match outcome {
            FetchOutcome::Transient(_) => RetryDecision::Retry {
                after: calculate_backoff(attempt, self.backoff_base_ms),
            },
            FetchOutcome::Success(_) | FetchOutcome::Fatal(_) => RetryDecision::Finish,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Wraps a bounded transport with the retry policy.
#[derive(Clone)]
pub struct RetryingFetch {
    service: String,
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryingFetch {
    pub fn new(service: impl Into<String>, transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self {
            service: service.into(),
            transport,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper (tests inject one that records instead of waiting).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Issue `request`, retrying once on a transient outcome.
    pub async fn fetch(&self, request: FetchRequest) -> FetchOutcome {
        let mut attempt = 1;
        loop {
            let outcome = self.transport.execute(request.clone()).await;
            metrics::record_upstream_request(&self.service, outcome.label());

            match self.policy.decide(attempt, &outcome) {
                RetryDecision::Retry { after } => {
                    tracing::info!(
                        service = %self.service,
                        url = %request.url,
                        attempt,
                        outcome = outcome.label(),
                        delay = ?after,
                        "Retrying upstream request"
                    );
                    metrics::record_retry(&self.service);
                    self.sleeper.sleep(after).await;
                    attempt += 1;
                }
                RetryDecision::Finish => {
                    if !matches!(outcome, FetchOutcome::Success(_)) {
                        tracing::debug!(
                            service = %self.service,
                            url = %request.url,
                            attempts = attempt,
                            outcome = outcome.label(),
                            "Upstream request failed"
                        );
                    }
                    return outcome;
                }
            }
        }
    }
}

impl HttpTransport for RetryingFetch {
    fn execute(&self, request: FetchRequest) -> BoxFuture<'_, FetchOutcome> {
        Box::pin(self.fetch(request))
    }
}
