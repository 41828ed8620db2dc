//! Metrics aggregation: per-service summary data.
//!
//! Each service contributes one report built by its [`MetricsCollector`].
//! A collector error becomes an `error` entry for that service only.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::aggregator::settle::settle_all;
use crate::error::IntegrationResult;
use crate::health::state::{AggregateResult, ServiceReport};
use crate::services::{collector_for, ServiceClient, ServiceRegistry};

/// Gathers summary fields for one service.
pub trait MetricsCollector: Send + Sync {
    fn collect<'a>(&'a self, client: &'a ServiceClient) -> BoxFuture<'a, IntegrationResult<ServiceReport>>;
}

pub struct MetricsAggregator {
    registry: Arc<ServiceRegistry>,
    collectors: HashMap<String, Arc<dyn MetricsCollector>>,
}

impl MetricsAggregator {
    /// Use the product collector for every configured service.
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        let collectors = registry
            .iter()
            .map(|handle| (handle.id().to_string(), collector_for(handle.client.kind())))
            .collect();
        Self {
            registry,
            collectors,
        }
    }

    /// Replace the collector for service `id`.
    pub fn with_collector(mut self, id: &str, collector: Arc<dyn MetricsCollector>) -> Self {
        self.collectors.insert(id.to_string(), collector);
        self
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Collect every configured service concurrently.
    pub async fn run(&self) -> AggregateResult {
        let calls = self.registry.iter().filter_map(|handle| {
            let collector = self.collectors.get(handle.id())?;
            Some((handle.id().to_string(), collector.collect(&handle.client)))
        });

        let mut aggregate: AggregateResult = settle_all(calls)
            .await
            .into_iter()
            .map(|(id, result)| {
                let report = to_report(&id, result);
                (id, report)
            })
            .collect();

        for id in self.registry.ids() {
            if aggregate.get(&id).is_none() {
                aggregate.insert(id, ServiceReport::error("no metrics collector"));
            }
        }
        aggregate
    }

    /// Collect a single service. `None` if `id` is not configured.
    pub async fn run_one(&self, id: &str) -> Option<ServiceReport> {
        let handle = self.registry.get(id)?;
        let report = match self.collectors.get(id) {
            Some(collector) => to_report(id, collector.collect(&handle.client).await),
            None => ServiceReport::error("no metrics collector"),
        };
        Some(report)
    }
}

fn to_report(id: &str, result: IntegrationResult<ServiceReport>) -> ServiceReport {
    result.unwrap_or_else(|e| {
        tracing::warn!(service = %id, error = %e, "Metrics collection failed");
        ServiceReport::error(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::error::IntegrationError;
    use crate::health::state::ServiceStatus;

    struct Fixed(IntegrationResult<ServiceReport>);

    impl MetricsCollector for Fixed {
        fn collect<'a>(&'a self, _client: &'a ServiceClient) -> BoxFuture<'a, IntegrationResult<ServiceReport>> {
            let result = self.0.clone();
            Box::pin(async move { result })
        }
    }

    fn aggregator() -> MetricsAggregator {
        let registry = Arc::new(ServiceRegistry::from_config(&GatewayConfig::default()).unwrap());
        let mut aggregator = MetricsAggregator::new(registry.clone());
        for id in registry.ids() {
            aggregator = aggregator.with_collector(
                &id,
                Arc::new(Fixed(Ok(ServiceReport::online().with_field("service", id.as_str())))),
            );
        }
        aggregator
    }

    #[tokio::test]
    async fn test_failure_does_not_affect_siblings() {
        let aggregator = aggregator().with_collector(
            "wazuh",
            Arc::new(Fixed(Err(IntegrationError::Status {
                status: 500,
                body: "internal".into(),
            }))),
        );

        let result = aggregator.run().await;
        assert_eq!(result.len(), 5);

        let wazuh = result.get("wazuh").unwrap();
        assert_eq!(wazuh.status, ServiceStatus::Error);
        assert_eq!(wazuh.error.as_deref(), Some("upstream returned HTTP 500: internal"));

        for id in ["grafana", "opencti", "thehive", "cortex"] {
            let report = result.get(id).unwrap();
            assert!(report.is_online());
            assert_eq!(report.data["service"], id);
        }
    }

    #[tokio::test]
    async fn test_run_one() {
        let aggregator = aggregator();
        assert!(aggregator.run_one("grafana").await.unwrap().is_online());
        assert!(aggregator.run_one("splunk").await.is_none());
    }
}
