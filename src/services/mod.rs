//! Upstream service endpoints and per-product integrations.
//!
//! # Data Flow
//! ```text
//! ServiceConfig (validated)
//!     → ServiceEndpoint (immutable, Arc-shared)
//!     → ServiceClient (auth + retrying / bounded fetch)
//!     → wazuh.rs | grafana.rs | opencti.rs | thehive.rs | cortex.rs
//!       (typed responses → summary fields)
//! ```

pub mod client;
pub mod cortex;
pub mod grafana;
pub mod opencti;
pub mod thehive;
pub mod wazuh;

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::aggregator::MetricsCollector;
use crate::auth::CredentialCache;
use crate::config::{CatalogEntry, CredentialConfig, GatewayConfig, LivenessPolicy, ServiceConfig, ServiceKind};
use crate::error::{IntegrationError, IntegrationResult};
use crate::resilience::{HttpTransport, ReqwestTransport};

pub use client::{CallMode, ClientSettings, ServiceClient};

/// Stable service identifier, e.g. `"wazuh"`.
pub type ServiceId = String;

/// Credential material resolved from configuration.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    None,
    Bearer(String),
    TokenExchange {
        username: String,
        password: String,
        auth_url: Url,
        ttl: Duration,
    },
}

impl Credential {
    pub fn is_configured(&self) -> bool {
        !matches!(self, Credential::None)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::None => f.write_str("None"),
            Credential::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Credential::TokenExchange {
                username,
                auth_url,
                ttl,
                ..
            } => f
                .debug_struct("TokenExchange")
                .field("username", username)
                .field("auth_url", &auth_url.as_str())
                .field("ttl", ttl)
                .finish(),
        }
    }
}

/// One configured upstream. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    pub id: ServiceId,
    pub kind: ServiceKind,
    pub base_url: Url,
    pub probe_url: Url,
    pub credential: Credential,
    pub liveness: LivenessPolicy,
    pub accept_invalid_certs: bool,
    pub catalog: CatalogEntry,
}

impl ServiceEndpoint {
    pub fn from_config(config: &ServiceConfig) -> IntegrationResult<Self> {
        let base_url = parse_url(&config.id, &config.base_url)?;
        let probe_url = match &config.probe_url {
            Some(url) => parse_url(&config.id, url)?,
            None => join(&config.id, &base_url, &config.probe_path)?,
        };

        let credential = match &config.credential {
            CredentialConfig::None => Credential::None,
            CredentialConfig::Bearer { token } => Credential::Bearer(token.clone()),
            CredentialConfig::TokenExchange {
                username,
                password,
                auth_path,
                token_ttl_ms,
            } => Credential::TokenExchange {
                username: username.clone(),
                password: password.clone(),
                auth_url: join(&config.id, &base_url, auth_path)?,
                ttl: Duration::from_millis(*token_ttl_ms),
            },
        };

        Ok(Self {
            id: config.id.clone(),
            kind: config.kind,
            base_url,
            probe_url,
            credential,
            liveness: config.liveness.clone(),
            accept_invalid_certs: config.accept_invalid_certs,
            catalog: config.catalog.clone(),
        })
    }

    /// `base_url + path`, with every non-empty `query` pair appended.
    pub fn api_url(&self, path: &str, query: &[(&str, String)]) -> IntegrationResult<Url> {
        let mut url = join(&self.id, &self.base_url, path)?;
        let mut pairs = query.iter().filter(|(_, v)| !v.is_empty()).peekable();
        if pairs.peek().is_some() {
            url.query_pairs_mut()
                .extend_pairs(pairs.map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}

fn parse_url(id: &str, raw: &str) -> IntegrationResult<Url> {
    Url::parse(raw)
        .map_err(|e| IntegrationError::InvalidArgument(format!("service '{id}': bad URL '{raw}': {e}")))
}

fn join(id: &str, base: &Url, path: &str) -> IntegrationResult<Url> {
    let raw = format!("{}{}", base.as_str().trim_end_matches('/'), path);
    parse_url(id, &raw)
}

/// Metrics collector for a product.
pub fn collector_for(kind: ServiceKind) -> Arc<dyn MetricsCollector> {
    match kind {
        ServiceKind::Wazuh => Arc::new(wazuh::WazuhCollector),
        ServiceKind::Grafana => Arc::new(grafana::GrafanaCollector),
        ServiceKind::OpenCti => Arc::new(opencti::OpenCtiCollector),
        ServiceKind::TheHive => Arc::new(thehive::TheHiveCollector),
        ServiceKind::Cortex => Arc::new(cortex::CortexCollector),
    }
}

/// A configured service: its API client and its liveness transport.
pub struct ServiceHandle {
    pub client: Arc<ServiceClient>,
    pub probe: Arc<dyn HttpTransport>,
}

impl ServiceHandle {
    pub fn id(&self) -> &str {
        self.client.id()
    }

    pub fn endpoint(&self) -> &Arc<ServiceEndpoint> {
        self.client.endpoint()
    }
}

/// Every configured service, in configuration order.
pub struct ServiceRegistry {
    handles: Vec<ServiceHandle>,
    credentials: Arc<CredentialCache>,
}

impl ServiceRegistry {
    /// Build clients backed by pooled `reqwest` transports.
    pub fn from_config(config: &GatewayConfig) -> IntegrationResult<Self> {
        Self::build(
            config,
            Arc::new(CredentialCache::new()),
            ClientSettings::from_config(config),
            |endpoint, follow_redirects| {
                let transport = ReqwestTransport::new(endpoint.accept_invalid_certs, follow_redirects)?;
                Ok(Arc::new(transport) as Arc<dyn HttpTransport>)
            },
        )
    }

    /// Build clients with caller-supplied transports.
    ///
    /// `make_transport(endpoint, follow_redirects)` is called twice per
    /// service: once for API calls (redirects followed) and once for
    /// liveness probes (redirects observed as-is).
    pub fn build<F>(
        config: &GatewayConfig,
        credentials: Arc<CredentialCache>,
        settings: ClientSettings,
        make_transport: F,
    ) -> IntegrationResult<Self>
    where
        F: Fn(&ServiceEndpoint, bool) -> IntegrationResult<Arc<dyn HttpTransport>>,
    {
        let mut handles = Vec::with_capacity(config.services.len());
        for service in &config.services {
            let endpoint = Arc::new(ServiceEndpoint::from_config(service)?);
            let api = make_transport(&endpoint, true)?;
            let probe = make_transport(&endpoint, false)?;
            let client = Arc::new(ServiceClient::new(
                endpoint,
                api,
                credentials.clone(),
                settings.clone(),
            ));
            handles.push(ServiceHandle { client, probe });
        }
        Ok(Self {
            handles,
            credentials,
        })
    }

    pub fn get(&self, id: &str) -> Option<&ServiceHandle> {
        self.handles.iter().find(|h| h.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceHandle> {
        self.handles.iter()
    }

    pub fn ids(&self) -> Vec<ServiceId> {
        self.handles.iter().map(|h| h.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_defaults() {
        let config = GatewayConfig::default();
        let wazuh = ServiceEndpoint::from_config(config.service("wazuh").unwrap()).unwrap();
        assert_eq!(wazuh.probe_url.as_str(), "https://localhost:5601/");
        assert!(!wazuh.credential.is_configured());

        let grafana = ServiceEndpoint::from_config(config.service("grafana").unwrap()).unwrap();
        assert_eq!(grafana.probe_url.as_str(), "http://localhost:3000/api/health");
    }

    #[test]
    fn test_token_exchange_url_joins_base() {
        let mut config = GatewayConfig::default();
        let wazuh = config.service_mut("wazuh").unwrap();
        wazuh.base_url = "https://siem.local:55000/".into();
        wazuh.credential = CredentialConfig::TokenExchange {
            username: "wazuh-wui".into(),
            password: "pw".into(),
            auth_path: "/security/user/authenticate".into(),
            token_ttl_ms: 850_000,
        };
        let endpoint = ServiceEndpoint::from_config(wazuh).unwrap();
        match endpoint.credential {
            Credential::TokenExchange { auth_url, ttl, .. } => {
                assert_eq!(auth_url.as_str(), "https://siem.local:55000/security/user/authenticate");
                assert_eq!(ttl, Duration::from_millis(850_000));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_api_url_skips_empty_query_values() {
        let config = GatewayConfig::default();
        let endpoint = ServiceEndpoint::from_config(config.service("wazuh").unwrap()).unwrap();

        let url = endpoint
            .api_url("/alerts", &[("limit", "20".into()), ("agent.id", String::new())])
            .unwrap();
        assert_eq!(url.as_str(), "https://localhost:55000/alerts?limit=20");

        let url = endpoint.api_url("/rules?limit=1", &[]).unwrap();
        assert_eq!(url.as_str(), "https://localhost:55000/rules?limit=1");
    }

    #[test]
    fn test_registry_keeps_config_order() {
        let config = GatewayConfig::default();
        let registry = ServiceRegistry::from_config(&config).unwrap();
        assert_eq!(
            registry.ids(),
            vec!["wazuh", "grafana", "opencti", "thehive", "cortex"]
        );
        assert!(registry.get("cortex").is_some());
        assert!(registry.get("splunk").is_none());
    }

    #[test]
    fn test_credential_debug_redacts() {
        let credential = Credential::Bearer("api-key-123".into());
        assert!(!format!("{:?}", credential).contains("api-key-123"));
    }
}
