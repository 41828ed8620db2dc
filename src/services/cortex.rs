//! Cortex analyzers.
//!
//! The status endpoint needs no credentials and is required. The analyzer
//! listing is only attempted with an API key, and any failure there counts as
//! zero analyzers (a fresh Cortex has no organisation yet).

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::aggregator::MetricsCollector;
use crate::error::IntegrationResult;
use crate::health::state::ServiceReport;
use crate::services::ServiceClient;

/// `/api/status` answer shared by TheHive and Cortex.
#[derive(Debug, Default, Deserialize)]
pub struct StatusInfo {
    #[serde(default)]
    pub versions: std::collections::HashMap<String, String>,
}

impl StatusInfo {
    /// Version of `product`, or `"unknown"`.
    pub fn version_of(&self, product: &str) -> String {
        self.versions
            .get(product)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CortexSummary {
    pub version: String,
    pub analyzers: usize,
}

pub struct CortexCollector;

impl CortexCollector {
    async fn gather(client: &ServiceClient) -> IntegrationResult<ServiceReport> {
        let status: StatusInfo = client.get_public("/api/status").await?;

        let analyzers = if client.has_credential() {
            let deadline = client.probe_timeout();
            match client
                .get_json_within::<Vec<serde_json::Value>>("/api/analyzer", &[], deadline)
                .await
            {
                Ok(list) => list.len(),
                Err(e) => {
                    tracing::debug!(error = %e, "Analyzer listing unavailable");
                    0
                }
            }
        } else {
            0
        };

        Ok(ServiceReport::online_with(&CortexSummary {
            version: status.version_of("Cortex"),
            analyzers,
        }))
    }
}

impl MetricsCollector for CortexCollector {
    fn collect<'a>(&'a self, client: &'a ServiceClient) -> BoxFuture<'a, IntegrationResult<ServiceReport>> {
        Box::pin(Self::gather(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use crate::auth::CredentialCache;
    use crate::config::{CredentialConfig, GatewayConfig};
    use crate::resilience::testing::{RecordingSleeper, ScriptedTransport};
    use crate::services::{ClientSettings, ServiceEndpoint};

    #[tokio::test]
    async fn test_analyzer_listing_uses_probe_deadline() {
        let mut config = GatewayConfig::default();
        let service = config.service_mut("cortex").unwrap();
        service.base_url = "http://cortex.test:9001".into();
        service.credential = CredentialConfig::Bearer { token: "cortex-key".into() };
        let endpoint = Arc::new(ServiceEndpoint::from_config(service).unwrap());
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedTransport::ok_json(json!({ "versions": { "Cortex": "3.1.8-1" } })),
            ScriptedTransport::ok_json(json!([{ "id": "a" }])),
        ]));
        let settings = ClientSettings::default().with_sleeper(Arc::new(RecordingSleeper::default()));
        let client = ServiceClient::new(endpoint, transport.clone(), Arc::new(CredentialCache::new()), settings);

        let report = CortexCollector.collect(&client).await.unwrap();
        assert_eq!(report.data["analyzers"], 1);
        assert_eq!(report.data["version"], "3.1.8-1");

        let requests = transport.requests();
        assert_eq!(requests[1].url.path(), "/api/analyzer");
        assert_eq!(requests[1].timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_version_lookup() {
        let status: StatusInfo =
            serde_json::from_str(r#"{"versions": {"Cortex": "3.1.8-1", "Elastic4Play": "1.13"}}"#).unwrap();
        assert_eq!(status.version_of("Cortex"), "3.1.8-1");
        assert_eq!(status.version_of("TheHive"), "unknown");

        let empty: StatusInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.version_of("Cortex"), "unknown");
    }
}
