//! Startup checks.
//!
//! # Responsibilities
//! - Verify a tool adapter has the credentials its service needs
//! - Run a best-effort connectivity probe that only warns
//!
//! # Design Decisions
//! - Fail fast: missing credentials abort before any request is made
//! - Reachability is not required at startup; tools fail per call instead

use thiserror::Error;

use crate::config::{ConfigError, CredentialConfig, GatewayConfig, ServiceKind};
use crate::error::IntegrationError;
use crate::resilience::FetchOutcome;
use crate::services::ServiceClient;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("service '{0}' is not configured")]
    UnknownService(String),

    #[error("{service} requires {vars}")]
    MissingCredentials {
        service: String,
        vars: &'static str,
    },

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The environment variables that supply a product's credential.
pub fn credential_vars(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Wazuh => "WAZUH_API_USER and WAZUH_API_PASSWORD",
        ServiceKind::OpenCti => "OPENCTI_TOKEN",
        ServiceKind::TheHive => "THEHIVE_API_KEY",
        ServiceKind::Cortex => "CORTEX_API_KEY",
        ServiceKind::Grafana => "a bearer token",
    }
}

/// Fail unless service `id` carries a usable credential.
pub fn require_credentials(config: &GatewayConfig, id: &str) -> Result<(), StartupError> {
    let service = config
        .service(id)
        .ok_or_else(|| StartupError::UnknownService(id.to_string()))?;

    let usable = match &service.credential {
        CredentialConfig::None => false,
        CredentialConfig::Bearer { token } => !token.is_empty(),
        CredentialConfig::TokenExchange {
            username, password, ..
        } => !username.is_empty() && !password.is_empty(),
    };

    if usable {
        Ok(())
    } else {
        Err(StartupError::MissingCredentials {
            service: service.id.clone(),
            vars: credential_vars(service.kind),
        })
    }
}

/// Probe `path` once and log the result. Never fails.
pub async fn check_connectivity(client: &ServiceClient, path: &str) {
    let base = client.endpoint().base_url.clone();
    match client.reach(path).await {
        Ok(FetchOutcome::Success(_)) => {
            tracing::info!(service = %client.id(), url = %base, "Connectivity OK");
        }
        Ok(outcome) if outcome.status().is_some() => {
            tracing::info!(
                service = %client.id(),
                url = %base,
                status = outcome.status(),
                "Upstream answered connectivity probe"
            );
        }
        Ok(outcome) => {
            tracing::warn!(
                service = %client.id(),
                url = %base,
                outcome = outcome.label(),
                "Upstream unreachable; tools will fail until it is available"
            );
        }
        Err(e) => {
            tracing::warn!(service = %client.id(), error = %e, "Connectivity probe not attempted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_are_fatal() {
        let config = GatewayConfig::default();
        let err = require_credentials(&config, "wazuh").unwrap_err();
        assert_eq!(
            err.to_string(),
            "wazuh requires WAZUH_API_USER and WAZUH_API_PASSWORD"
        );
        assert!(matches!(
            require_credentials(&config, "splunk"),
            Err(StartupError::UnknownService(_))
        ));
    }

    #[test]
    fn test_present_credentials_pass() {
        let mut config = GatewayConfig::default();
        config.service_mut("opencti").unwrap().credential = CredentialConfig::Bearer {
            token: "t".into(),
        };
        assert!(require_credentials(&config, "opencti").is_ok());

        config.service_mut("wazuh").unwrap().credential = CredentialConfig::TokenExchange {
            username: "wazuh-wui".into(),
            password: String::new(),
            auth_path: "/security/user/authenticate".into(),
            token_ttl_ms: 850_000,
        };
        assert!(require_credentials(&config, "wazuh").is_err());
    }
}
