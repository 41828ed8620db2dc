//! Wazuh SIEM / XDR.
//!
//! Summary collection issues five authenticated calls concurrently. The SCA
//! call is optional: its failure yields an empty policy list.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::aggregator::MetricsCollector;
use crate::error::{IntegrationError, IntegrationResult};
use crate::health::state::ServiceReport;
use crate::services::ServiceClient;

/// Alerts at or above this rule level count as critical.
pub const CRITICAL_LEVEL: u32 = 10;

const AGENT_FIELDS: &str = "id,name,status,os.name,os.version,ip,version,dateAdd,lastKeepAlive";

/// Standard `{"data": {...}}` envelope of the Wazuh API.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct Items<T> {
    #[serde(default = "Vec::new")]
    pub affected_items: Vec<T>,
    #[serde(default)]
    pub total_affected_items: u64,
}

#[derive(Debug, Deserialize)]
pub struct HourlyStats {
    #[serde(default)]
    pub alerts: Vec<AlertCount>,
}

#[derive(Debug, Deserialize)]
pub struct AlertCount {
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub times: u64,
}

#[derive(Debug, Deserialize)]
pub struct RawAgent {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    pub os: Option<RawOs>,
    pub ip: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "dateAdd")]
    pub date_add: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawOs {
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ManagerInfo {
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct RawScaPolicy {
    #[serde(default)]
    pub name: String,
    pub score: Option<Number>,
    #[serde(default)]
    pub pass: u64,
    #[serde(default)]
    pub fail: u64,
    pub invalid: Option<u64>,
    pub not_applicable: Option<u64>,
    #[serde(default)]
    pub total_checks: u64,
    #[serde(default)]
    pub policy_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub status: String,
    pub os: String,
    pub ip: String,
    pub version: String,
    pub registered: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaPolicy {
    pub name: String,
    pub score: Option<Number>,
    pub pass: u64,
    pub fail: u64,
    pub invalid: u64,
    pub not_applicable: u64,
    pub total: u64,
    pub policy_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WazuhSummary {
    pub total_alerts: u64,
    pub critical_alerts: u64,
    pub active_agents: usize,
    pub total_agents: u64,
    pub total_rules: u64,
    pub version: String,
    pub agents: Vec<AgentSummary>,
    pub sca: Vec<ScaPolicy>,
}

/// `(total, critical)` alert counts over all hourly buckets.
pub fn count_alerts(stats: &[HourlyStats]) -> (u64, u64) {
    stats
        .iter()
        .flat_map(|hour| hour.alerts.iter())
        .fold((0, 0), |(total, critical), alert| {
            let critical = if alert.level >= CRITICAL_LEVEL {
                critical + alert.times
            } else {
                critical
            };
            (total + alert.times, critical)
        })
}

pub fn summarize_agent(agent: &RawAgent) -> AgentSummary {
    let os = match agent.os.as_ref() {
        Some(RawOs {
            name: Some(name),
            version,
        }) => format!("{} {}", name, version.as_deref().unwrap_or_default())
            .trim()
            .to_string(),
        _ => "unknown".to_string(),
    };
    AgentSummary {
        id: agent.id.clone(),
        name: agent.name.clone(),
        status: agent.status.clone(),
        os,
        ip: agent.ip.clone().unwrap_or_else(|| "N/A".to_string()),
        version: agent.version.clone().unwrap_or_else(|| "unknown".to_string()),
        registered: agent.date_add.clone().unwrap_or_else(|| "unknown".to_string()),
    }
}

pub fn summarize_sca(policy: &RawScaPolicy) -> ScaPolicy {
    ScaPolicy {
        name: policy.name.clone(),
        score: policy.score.clone(),
        pass: policy.pass,
        fail: policy.fail,
        invalid: policy.invalid.unwrap_or(0),
        not_applicable: policy.not_applicable.unwrap_or(0),
        total: policy.total_checks,
        policy_id: policy.policy_id.clone(),
    }
}

/// Combine the decoded responses into the summary.
pub fn summarize(
    stats: &Items<HourlyStats>,
    agents: &Items<RawAgent>,
    info: &Items<ManagerInfo>,
    rules: &Items<serde_json::Value>,
    sca: Option<&Items<RawScaPolicy>>,
) -> WazuhSummary {
    let (total_alerts, critical_alerts) = count_alerts(&stats.affected_items);
    let agent_list: Vec<AgentSummary> = agents.affected_items.iter().map(summarize_agent).collect();
    let active_agents = agent_list.iter().filter(|a| a.status == "active").count();

    WazuhSummary {
        total_alerts,
        critical_alerts,
        active_agents,
        total_agents: agents.total_affected_items,
        total_rules: rules.total_affected_items,
        version: info
            .affected_items
            .first()
            .map(|i| i.version.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        agents: agent_list,
        sca: sca
            .map(|s| s.affected_items.iter().map(summarize_sca).collect())
            .unwrap_or_default(),
    }
}

pub struct WazuhCollector;

impl WazuhCollector {
    async fn gather(client: &ServiceClient) -> IntegrationResult<ServiceReport> {
        if !client.has_credential() {
            return Err(IntegrationError::MissingCredential(
                "WAZUH_API_USER and WAZUH_API_PASSWORD".into(),
            ));
        }
        let agent_query = [("select", AGENT_FIELDS.to_string())];
        let (stats, agents, info, rules, sca) = tokio::join!(
            client.get_json::<Envelope<Items<HourlyStats>>>("/manager/stats", &[]),
            client.get_json::<Envelope<Items<RawAgent>>>("/agents", &agent_query),
            client.get_json::<Envelope<Items<ManagerInfo>>>("/manager/info", &[]),
            client.get_json::<Envelope<Items<serde_json::Value>>>("/rules?limit=1", &[]),
            client.get_json::<Envelope<Items<RawScaPolicy>>>("/sca/000", &[]),
        );

        let sca = match sca {
            Ok(sca) => Some(sca),
            Err(e) => {
                tracing::debug!(error = %e, "SCA results unavailable");
                None
            }
        };
        let summary = summarize(
            &stats?.data,
            &agents?.data,
            &info?.data,
            &rules?.data,
            sca.as_ref().map(|s| &s.data),
        );
        Ok(ServiceReport::online_with(&summary))
    }
}

impl MetricsCollector for WazuhCollector {
    fn collect<'a>(&'a self, client: &'a ServiceClient) -> BoxFuture<'a, IntegrationResult<ServiceReport>> {
        Box::pin(Self::gather(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value::<Envelope<T>>(value).unwrap().data
    }

    #[test]
    fn test_alert_counting() {
        let stats: Items<HourlyStats> = decode(json!({"data": {"affected_items": [
            {"alerts": [{"sigid": 1, "level": 3, "times": 10}, {"sigid": 2, "level": 12, "times": 2}]},
            {"alerts": [{"sigid": 3, "level": 10, "times": 1}]},
            {}
        ]}}));
        assert_eq!(count_alerts(&stats.affected_items), (13, 3));
    }

    #[test]
    fn test_agent_defaults() {
        let agents: Items<RawAgent> = decode(json!({"data": {
            "total_affected_items": 2,
            "affected_items": [
                {"id": "000", "name": "manager", "status": "active",
                 "os": {"name": "Ubuntu", "version": "22.04"}, "ip": "127.0.0.1",
                 "version": "Wazuh v4.9.0", "dateAdd": "2024-01-01T00:00:00Z"},
                {"id": "001", "name": "edge", "status": "disconnected", "os": {"version": "x"}}
            ]
        }}));
        let summaries: Vec<_> = agents.affected_items.iter().map(summarize_agent).collect();
        assert_eq!(summaries[0].os, "Ubuntu 22.04");
        assert_eq!(summaries[1].os, "unknown");
        assert_eq!(summaries[1].ip, "N/A");
        assert_eq!(summaries[1].version, "unknown");
        assert_eq!(summaries[1].registered, "unknown");
    }

    #[test]
    fn test_summary_shape() {
        let stats: Items<HourlyStats> = decode(json!({"data": {"affected_items": []}}));
        let agents: Items<RawAgent> = decode(json!({"data": {"total_affected_items": 1, "affected_items": [
            {"id": "000", "name": "m", "status": "active"}
        ]}}));
        let info: Items<ManagerInfo> = decode(json!({"data": {"affected_items": [{"version": "v4.9.0"}]}}));
        let rules: Items<serde_json::Value> = decode(json!({"data": {"total_affected_items": 4321, "affected_items": [{}]}}));
        let sca: Items<RawScaPolicy> = decode(json!({"data": {"affected_items": [
            {"name": "CIS Ubuntu", "score": 61, "pass": 100, "fail": 64, "total_checks": 190, "policy_id": "cis_ubuntu22-04"}
        ]}}));

        let summary = summarize(&stats, &agents, &info, &rules, Some(&sca));
        let value = serde_json::to_value(ServiceReport::online_with(&summary)).unwrap();
        assert_eq!(value["status"], "online");
        assert_eq!(value["totalAlerts"], 0);
        assert_eq!(value["activeAgents"], 1);
        assert_eq!(value["totalAgents"], 1);
        assert_eq!(value["totalRules"], 4321);
        assert_eq!(value["version"], "v4.9.0");
        assert_eq!(value["sca"][0]["score"], 61);
        assert_eq!(value["sca"][0]["notApplicable"], 0);
        assert_eq!(value["sca"][0]["policyId"], "cis_ubuntu22-04");

        let without_sca = summarize(&stats, &agents, &info, &rules, None);
        assert!(without_sca.sca.is_empty());
    }

    #[test]
    fn test_missing_version_is_unknown() {
        let empty = || decode::<Items<ManagerInfo>>(json!({"data": {}}));
        let summary = summarize(
            &decode(json!({"data": {}})),
            &decode(json!({"data": {}})),
            &empty(),
            &decode(json!({"data": {}})),
            None,
        );
        assert_eq!(summary.version, "unknown");
        assert_eq!(summary.total_agents, 0);
    }
}
