//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the integration gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration for the dashboard API.
    pub listener: ListenerConfig,

    /// Timeouts for outbound calls.
    pub timeouts: TimeoutConfig,

    /// Retry policy for outbound calls.
    pub retries: RetryConfig,

    /// Size ceiling for payloads handed to downstream consumers.
    pub governor: GovernorConfig,

    /// Polling intervals for the background status monitor.
    pub schedule: ScheduleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Upstream security services.
    pub services: Vec<ServiceConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            retries: RetryConfig::default(),
            governor: GovernorConfig::default(),
            schedule: ScheduleConfig::default(),
            observability: ObservabilityConfig::default(),
            services: default_services(),
        }
    }
}

impl GatewayConfig {
    /// Find a service by id.
    pub fn service(&self, id: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.id == id)
    }

    /// Find a service by id for in-place overrides.
    pub fn service_mut(&mut self, id: &str) -> Option<&mut ServiceConfig> {
        self.services.iter_mut().find(|s| s.id == id)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Whole-request timeout for the dashboard API in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Timeouts for outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for authenticated API calls in milliseconds.
    pub api_ms: u64,

    /// Deadline for liveness probes and unauthenticated status calls in milliseconds.
    pub probe_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            api_ms: 10_000,
            probe_ms: 5_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one (1 disables retries, at most 2).
    pub max_attempts: u32,

    /// Backoff unit in milliseconds; the wait before attempt `n + 1` is `n * base`.
    pub backoff_base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff_base_ms: 1_000,
        }
    }
}

/// Response governor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Maximum characters of serialized output handed to a consumer.
    pub max_response_chars: usize,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_response_chars: 50_000,
        }
    }
}

/// Background polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Run the background status monitor.
    pub enabled: bool,

    /// Liveness aggregation interval in seconds.
    pub health_interval_secs: u64,

    /// Metrics aggregation interval in seconds.
    pub metrics_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            health_interval_secs: 30,
            metrics_interval_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Which upstream product a service entry talks to.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Wazuh,
    Grafana,
    #[serde(rename = "opencti")]
    OpenCti,
    #[serde(rename = "thehive")]
    TheHive,
    Cortex,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Wazuh => "wazuh",
            ServiceKind::Grafana => "grafana",
            ServiceKind::OpenCti => "opencti",
            ServiceKind::TheHive => "thehive",
            ServiceKind::Cortex => "cortex",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential material for one service.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialConfig {
    /// No authentication.
    #[default]
    None,

    /// Static bearer token or API key.
    Bearer { token: String },

    /// Basic-auth secret exchanged for a short-lived token.
    TokenExchange {
        username: String,
        password: String,
        #[serde(default = "default_auth_path")]
        auth_path: String,
        #[serde(default = "default_token_ttl_ms")]
        token_ttl_ms: u64,
    },
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialConfig::None => f.write_str("None"),
            CredentialConfig::Bearer { .. } => f.write_str("Bearer(<redacted>)"),
            CredentialConfig::TokenExchange {
                username,
                auth_path,
                token_ttl_ms,
                ..
            } => f
                .debug_struct("TokenExchange")
                .field("username", username)
                .field("password", &"<redacted>")
                .field("auth_path", auth_path)
                .field("token_ttl_ms", token_ttl_ms)
                .finish(),
        }
    }
}

pub fn default_auth_path() -> String {
    "/security/user/authenticate".to_string()
}

/// Upstream tokens live ~900 s; the cache refreshes ahead of that.
pub fn default_token_ttl_ms() -> u64 {
    850_000
}

/// Per-service liveness classification.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LivenessPolicy {
    /// A 3xx answer counts as online.
    pub redirect_is_online: bool,

    /// Any HTTP answer counts as online, whatever the status.
    pub any_status_is_online: bool,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            redirect_is_online: true,
            any_status_is_online: true,
        }
    }
}

/// Dashboard catalogue metadata for a service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CatalogEntry {
    pub name: String,
    pub role: String,
    pub badge: String,
    pub dashboard_url: String,
    pub embeddable: bool,
}

/// One upstream security service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unique service identifier, used as the aggregate key.
    pub id: String,

    /// Upstream product.
    pub kind: ServiceKind,

    /// Base URL of the service API.
    pub base_url: String,

    /// Full liveness URL, overriding `base_url + probe_path`.
    #[serde(default)]
    pub probe_url: Option<String>,

    /// Path appended to `base_url` for liveness probes.
    #[serde(default)]
    pub probe_path: String,

    /// Credential material.
    #[serde(default)]
    pub credential: CredentialConfig,

    /// Accept self-signed TLS certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Liveness classification policy.
    #[serde(default)]
    pub liveness: LivenessPolicy,

    /// Catalogue metadata served to the dashboard.
    #[serde(default)]
    pub catalog: CatalogEntry,
}

fn catalog(name: &str, role: &str, badge: &str, dashboard_url: &str, embeddable: bool) -> CatalogEntry {
    CatalogEntry {
        name: name.to_string(),
        role: role.to_string(),
        badge: badge.to_string(),
        dashboard_url: dashboard_url.to_string(),
        embeddable,
    }
}

/// The five services of a stock deployment, all on localhost.
pub fn default_services() -> Vec<ServiceConfig> {
    vec![
        ServiceConfig {
            id: "wazuh".to_string(),
            kind: ServiceKind::Wazuh,
            base_url: "https://localhost:55000".to_string(),
            probe_url: Some("https://localhost:5601".to_string()),
            probe_path: String::new(),
            credential: CredentialConfig::None,
            accept_invalid_certs: true,
            liveness: LivenessPolicy::default(),
            catalog: catalog("Wazuh", "SIEM / XDR", "SIEM", "https://localhost:5601", false),
        },
        ServiceConfig {
            id: "grafana".to_string(),
            kind: ServiceKind::Grafana,
            base_url: "http://localhost:3000".to_string(),
            probe_url: None,
            probe_path: "/api/health".to_string(),
            credential: CredentialConfig::None,
            accept_invalid_certs: false,
            liveness: LivenessPolicy::default(),
            catalog: catalog("Grafana", "Monitoring", "MONITOR", "http://localhost:3000", true),
        },
        ServiceConfig {
            id: "opencti".to_string(),
            kind: ServiceKind::OpenCti,
            base_url: "http://localhost:4000".to_string(),
            probe_url: None,
            probe_path: "/health".to_string(),
            credential: CredentialConfig::None,
            accept_invalid_certs: false,
            liveness: LivenessPolicy::default(),
            catalog: catalog(
                "OpenCTI",
                "Threat Intelligence",
                "THREAT INTEL",
                "http://localhost:4000",
                false,
            ),
        },
        ServiceConfig {
            id: "thehive".to_string(),
            kind: ServiceKind::TheHive,
            base_url: "http://localhost:9000".to_string(),
            probe_url: None,
            probe_path: "/api/status".to_string(),
            credential: CredentialConfig::None,
            accept_invalid_certs: false,
            liveness: LivenessPolicy::default(),
            catalog: catalog("TheHive", "Incident Response", "IR", "http://localhost:9000", true),
        },
        ServiceConfig {
            id: "cortex".to_string(),
            kind: ServiceKind::Cortex,
            base_url: "http://localhost:9001".to_string(),
            probe_url: None,
            probe_path: "/api/status".to_string(),
            credential: CredentialConfig::None,
            accept_invalid_certs: false,
            liveness: LivenessPolicy::default(),
            catalog: catalog(
                "Cortex",
                "Analysis & Response",
                "SOAR",
                "http://localhost:9001",
                false,
            ),
        },
    ]
}
