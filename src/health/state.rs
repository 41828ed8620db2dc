//! Per-service status reports and the aggregate map.
//!
//! # States
//! - Online: the service answered (and, for metrics, its data was extracted)
//! - Offline: the service could not be reached at all
//! - Error: the service was reached but the call or its decoding failed
//!
//! A report is serialized flat: `status`, optional `latency` and `error`,
//! followed by whatever summary fields the service produced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Online,
    Offline,
    Error,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Online => "online",
            ServiceStatus::Offline => "offline",
            ServiceStatus::Error => "error",
        }
    }
}

/// Outcome for one service in an aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceReport {
    pub status: ServiceStatus,

    /// Round-trip time in milliseconds (liveness only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ServiceReport {
    fn new(status: ServiceStatus) -> Self {
        Self {
            status,
            latency: None,
            error: None,
            data: Map::new(),
        }
    }

    pub fn online() -> Self {
        Self::new(ServiceStatus::Online)
    }

    pub fn offline() -> Self {
        Self::new(ServiceStatus::Offline)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(ServiceStatus::Error)
        }
    }

    /// Online, with the fields of `summary` merged in.
    pub fn online_with<T: Serialize>(summary: &T) -> Self {
        Self::online().with_data(summary)
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency = Some(latency_ms);
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// Merge the object fields of `summary`. Non-object values are ignored.
    pub fn with_data<T: Serialize>(mut self, summary: &T) -> Self {
        match serde_json::to_value(summary) {
            Ok(Value::Object(fields)) => self.data.extend(fields),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Summary could not be serialized"),
        }
        self
    }

    pub fn is_online(&self) -> bool {
        self.status == ServiceStatus::Online
    }
}

/// Service id → report. Holds one entry per configured service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateResult(BTreeMap<String, ServiceReport>);

impl AggregateResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, report: ServiceReport) {
        self.0.insert(id.into(), report);
    }

    pub fn get(&self, id: &str) -> Option<&ServiceReport> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ServiceReport)> {
        self.0.iter()
    }

    pub fn online_count(&self) -> usize {
        self.0.values().filter(|r| r.is_online()).count()
    }
}

impl FromIterator<(String, ServiceReport)> for AggregateResult {
    fn from_iter<I: IntoIterator<Item = (String, ServiceReport)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
