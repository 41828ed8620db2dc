//! Liveness aggregation: one lightweight probe per service.
//!
//! Probes never retry and never follow redirects. Whether a redirect or a
//! non-2xx answer counts as online is decided by each service's
//! [`LivenessPolicy`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::aggregator::settle::settle_all;
use crate::config::LivenessPolicy;
use crate::error::{IntegrationError, IntegrationResult};
use crate::health::state::{AggregateResult, ServiceReport};
use crate::observability::metrics;
use crate::resilience::{FetchOutcome, FetchRequest};
use crate::services::{ServiceHandle, ServiceRegistry};

pub struct LivenessAggregator {
    registry: Arc<ServiceRegistry>,
    timeout: Duration,
}

impl LivenessAggregator {
    pub fn new(registry: Arc<ServiceRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Probe every configured service concurrently.
    pub async fn run(&self) -> AggregateResult {
        let calls = self
            .registry
            .iter()
            .map(|handle| (handle.id().to_string(), self.probe(handle)));

        settle_all(calls)
            .await
            .into_iter()
            .map(|(id, result)| {
                let report = result.unwrap_or_else(|e| {
                    tracing::debug!(service = %id, error = %e, "Service unreachable");
                    ServiceReport::offline()
                });
                metrics::record_service_up(&id, report.is_online());
                (id, report)
            })
            .collect()
    }

    async fn probe(&self, handle: &ServiceHandle) -> IntegrationResult<ServiceReport> {
        let endpoint = handle.endpoint();
        let request = FetchRequest::get(endpoint.probe_url.clone(), self.timeout);

        let start = Instant::now();
        let outcome = handle.probe.execute(request).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let report = classify(&endpoint.liveness, outcome, latency_ms)?;
        metrics::record_probe(handle.id(), latency_ms);
        Ok(report)
    }
}

/// Map a probe outcome to a report under `policy`.
///
/// `Err` means the service could not be reached at all.
pub fn classify(
    policy: &LivenessPolicy,
    outcome: FetchOutcome,
    latency_ms: u64,
) -> IntegrationResult<ServiceReport> {
    let Some(status) = outcome.status() else {
        return Err(outcome
            .into_result()
            .err()
            .unwrap_or_else(|| IntegrationError::Network("no response".into())));
    };

    let online = (200..300).contains(&status)
        || ((300..400).contains(&status) && policy.redirect_is_online)
        || policy.any_status_is_online;

    if online {
        Ok(ServiceReport::online().with_latency(latency_ms))
    } else {
        Ok(ServiceReport::error(format!("HTTP {status}")).with_latency(latency_ms))
    }
}
