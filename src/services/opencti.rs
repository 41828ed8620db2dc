//! OpenCTI threat intelligence (GraphQL).

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::aggregator::MetricsCollector;
use crate::error::{IntegrationError, IntegrationResult};
use crate::health::state::ServiceReport;
use crate::services::{CallMode, ServiceClient};

pub const NO_TOKEN_NOTE: &str = "No API token configured";

const SUMMARY_QUERY: &str = r#"{
  about { version }
  stixCyberObservables(first: 0) { pageInfo { globalCount } }
  reports(first: 0) { pageInfo { globalCount } }
  connectors { id name active }
}"#;

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<Value>>,
}

impl<T> GraphQlResponse<T> {
    /// The `data` member, or the `errors` array as an error.
    pub fn into_data(self) -> IntegrationResult<T> {
        if let Some(errors) = self.errors {
            return Err(IntegrationError::GraphQl(Value::Array(errors).to_string()));
        }
        self.data
            .ok_or_else(|| IntegrationError::Malformed("GraphQL response without data".into()))
    }
}

/// POST a GraphQL document to `/graphql`.
pub async fn graphql<T: DeserializeOwned>(
    client: &ServiceClient,
    query: &str,
    variables: Value,
    mode: CallMode,
) -> IntegrationResult<T> {
    let body = json!({ "query": query, "variables": variables });
    client
        .post_json::<GraphQlResponse<T>>("/graphql", body, mode)
        .await?
        .into_data()
}

#[derive(Debug, Deserialize)]
pub struct PageInfo {
    #[serde(rename = "globalCount", default)]
    pub global_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct Counted {
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct About {
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct Connector {
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SummaryData {
    pub about: About,
    #[serde(rename = "stixCyberObservables")]
    pub observables: Counted,
    pub reports: Counted,
    #[serde(default)]
    pub connectors: Vec<Connector>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCtiSummary {
    pub version: String,
    pub indicators: u64,
    pub reports: u64,
    pub connectors: usize,
    pub active_connectors: usize,
}

impl From<SummaryData> for OpenCtiSummary {
    fn from(data: SummaryData) -> Self {
        Self {
            version: data.about.version,
            indicators: data.observables.page_info.global_count,
            reports: data.reports.page_info.global_count,
            connectors: data.connectors.len(),
            active_connectors: data.connectors.iter().filter(|c| c.active).count(),
        }
    }
}

pub struct OpenCtiCollector;

impl OpenCtiCollector {
    async fn gather(client: &ServiceClient) -> IntegrationResult<ServiceReport> {
        if !client.has_credential() {
            // Any HTTP answer means the platform is up; only the data needs a token.
            let outcome = client.reach("/health").await?;
            return Ok(if outcome.status().is_some() {
                ServiceReport::online().with_field("note", NO_TOKEN_NOTE)
            } else {
                ServiceReport::offline()
            });
        }

        let data: SummaryData = graphql(client, SUMMARY_QUERY, json!({}), CallMode::Retrying).await?;
        Ok(ServiceReport::online_with(&OpenCtiSummary::from(data)))
    }
}

impl MetricsCollector for OpenCtiCollector {
    fn collect<'a>(&'a self, client: &'a ServiceClient) -> BoxFuture<'a, IntegrationResult<ServiceReport>> {
        Box::pin(Self::gather(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_graphql_data() {
        let response: GraphQlResponse<SummaryData> = serde_json::from_value(json!({"data": {
            "about": {"version": "6.0.5"},
            "stixCyberObservables": {"pageInfo": {"globalCount": 1520}},
            "reports": {"pageInfo": {"globalCount": 37}},
            "connectors": [
                {"id": "1", "name": "MITRE", "active": true},
                {"id": "2", "name": "AbuseIPDB", "active": false},
                {"id": "3", "name": "CVE", "active": true}
            ]
        }}))
        .unwrap();
        let summary = OpenCtiSummary::from(response.into_data().unwrap());
        assert_eq!(
            summary,
            OpenCtiSummary {
                version: "6.0.5".into(),
                indicators: 1520,
                reports: 37,
                connectors: 3,
                active_connectors: 2,
            }
        );
    }

    #[test]
    fn test_errors_array_is_an_error() {
        let response: GraphQlResponse<SummaryData> =
            serde_json::from_value(json!({"data": null, "errors": [{"message": "Unauthorized"}]})).unwrap();
        match response.into_data().unwrap_err() {
            IntegrationError::GraphQl(msg) => assert!(msg.contains("Unauthorized")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_data_is_malformed() {
        let response: GraphQlResponse<Value> = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(response.into_data(), Err(IntegrationError::Malformed(_))));
    }
}
