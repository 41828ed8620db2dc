//! Environment variable overlay.
//!
//! Base URLs and secrets for each upstream are supplied through the process
//! environment. Variables override whatever the config file says; empty
//! values count as unset.

use crate::config::loader::ConfigError;
use crate::config::schema::{
    default_auth_path, default_token_ttl_ms, CredentialConfig, GatewayConfig,
};

/// Default Wazuh API user when only a password is supplied.
const DEFAULT_WAZUH_USER: &str = "wazuh-wui";

/// Apply overrides from the real process environment.
pub fn apply_process_env(config: &mut GatewayConfig) -> Result<(), ConfigError> {
    apply_env(config, |key| std::env::var(key).ok())
}

/// Apply overrides using `lookup` to read variables.
pub fn apply_env<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(addr) = get("MATCHBOX_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(raw) = get("REQUEST_TIMEOUT_MS") {
        config.timeouts.api_ms = parse_number("REQUEST_TIMEOUT_MS", &raw)?;
    }
    if let Some(raw) = get("MAX_RESPONSE_CHARS") {
        config.governor.max_response_chars = parse_number("MAX_RESPONSE_CHARS", &raw)?;
    }

    if let Some(wazuh) = config.service_mut("wazuh") {
        if let Some(url) = get("WAZUH_API_URL") {
            wazuh.base_url = url;
        }
        if let Some(url) = get("WAZUH_DASHBOARD_URL") {
            wazuh.probe_url = Some(url);
        }
        let user = get("WAZUH_API_USER");
        let password = get("WAZUH_API_PASSWORD");
        if user.is_some() || password.is_some() {
            let (auth_path, token_ttl_ms) = match &wazuh.credential {
                CredentialConfig::TokenExchange {
                    auth_path,
                    token_ttl_ms,
                    ..
                } => (auth_path.clone(), *token_ttl_ms),
                _ => (default_auth_path(), default_token_ttl_ms()),
            };
            let (current_user, current_password) = match &wazuh.credential {
                CredentialConfig::TokenExchange {
                    username, password, ..
                } => (Some(username.clone()), Some(password.clone())),
                _ => (None, None),
            };
            wazuh.credential = CredentialConfig::TokenExchange {
                username: user
                    .or(current_user)
                    .unwrap_or_else(|| DEFAULT_WAZUH_USER.to_string()),
                password: password.or(current_password).unwrap_or_default(),
                auth_path,
                token_ttl_ms,
            };
        }
    }

    if let Some(grafana) = config.service_mut("grafana") {
        if let Some(url) = get("GRAFANA_URL") {
            grafana.base_url = url;
        }
    }

    let bearer_services = [
        ("opencti", "OPENCTI_URL", "OPENCTI_TOKEN"),
        ("thehive", "THEHIVE_URL", "THEHIVE_API_KEY"),
        ("cortex", "CORTEX_URL", "CORTEX_API_KEY"),
    ];
    for (id, url_var, token_var) in bearer_services {
        if let Some(service) = config.service_mut(id) {
            if let Some(url) = get(url_var) {
                service.base_url = url;
            }
            if let Some(token) = get(token_var) {
                service.credential = CredentialConfig::Bearer { token };
            }
        }
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: raw.to_string(),
    })
}
