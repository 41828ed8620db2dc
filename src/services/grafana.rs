//! Grafana monitoring.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::aggregator::MetricsCollector;
use crate::error::IntegrationResult;
use crate::health::state::ServiceReport;
use crate::services::ServiceClient;

#[derive(Debug, Deserialize)]
pub struct GrafanaHealth {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrafanaSummary {
    pub version: String,
    pub database: String,
    pub dashboards: usize,
}

pub struct GrafanaCollector;

impl GrafanaCollector {
    async fn gather(client: &ServiceClient) -> IntegrationResult<ServiceReport> {
        let search_query = [("type", "dash-db".to_string())];
        let deadline = client.probe_timeout();
        let (health, dashboards) = tokio::join!(
            client.get_json_within::<GrafanaHealth>("/api/health", &[], deadline),
            client.get_json_within::<Vec<serde_json::Value>>("/api/search", &search_query, deadline),
        );
        let health = health?;

        // The search listing is informational; a failure only zeroes the count.
        let dashboards = dashboards.map(|d| d.len()).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Dashboard search unavailable");
            0
        });

        Ok(ServiceReport::online_with(&GrafanaSummary {
            version: health.version,
            database: health.database,
            dashboards,
        }))
    }
}

impl MetricsCollector for GrafanaCollector {
    fn collect<'a>(&'a self, client: &'a ServiceClient) -> BoxFuture<'a, IntegrationResult<ServiceReport>> {
        Box::pin(Self::gather(client))
    }
}
