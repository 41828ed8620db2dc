//! TheHive incident response.

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::{json, Value};

use crate::aggregator::MetricsCollector;
use crate::error::IntegrationResult;
use crate::health::state::ServiceReport;
use crate::services::cortex::StatusInfo;
use crate::services::{CallMode, ServiceClient};

pub const NO_KEY_NOTE: &str = "No API key configured";

/// Query listing cases whose stage is in progress.
pub fn open_cases_query() -> Value {
    json!({
        "query": [
            { "_name": "listCase" },
            { "_name": "filter", "_gte": { "_field": "stage", "_value": "InProgress" } },
            { "_name": "page", "from": 0, "to": 0, "extraData": ["total"] }
        ]
    })
}

/// Number of cases in a query answer. Non-array answers count as zero.
pub fn count_cases(answer: &Value) -> usize {
    answer.as_array().map(Vec::len).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TheHiveSummary {
    pub version: String,
    pub open_cases: usize,
}

pub struct TheHiveCollector;

impl TheHiveCollector {
    async fn gather(client: &ServiceClient) -> IntegrationResult<ServiceReport> {
        if !client.has_credential() {
            return Ok(match client.get_public::<StatusInfo>("/api/status").await {
                Ok(status) => ServiceReport::online()
                    .with_field("version", status.version_of("TheHive"))
                    .with_field("note", NO_KEY_NOTE),
                Err(e) => {
                    tracing::debug!(error = %e, "TheHive status unavailable");
                    ServiceReport::offline()
                }
            });
        }

        let cases: Value = client
            .post_json("/api/v1/query", open_cases_query(), CallMode::Retrying)
            .await?;
        let status: StatusInfo = client.get_public("/api/status").await?;

        Ok(ServiceReport::online_with(&TheHiveSummary {
            version: status.version_of("TheHive"),
            open_cases: count_cases(&cases),
        }))
    }
}

impl MetricsCollector for TheHiveCollector {
    fn collect<'a>(&'a self, client: &'a ServiceClient) -> BoxFuture<'a, IntegrationResult<ServiceReport>> {
        Box::pin(Self::gather(client))
    }
}
