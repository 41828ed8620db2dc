//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, retry budget <= 2 attempts)
//! - Check service ids are unique and URLs parse
//!
//! Returns all validation errors, not just the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{CredentialConfig, GatewayConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("retries.max_attempts must be 1 or 2, got {0}")]
    RetryAttempts(u32),

    #[error("services[{index}] has an empty id")]
    EmptyServiceId { index: usize },

    #[error("service id '{0}' is defined more than once")]
    DuplicateService(String),

    #[error("service '{id}' has invalid {field} '{value}'")]
    InvalidUrl {
        id: String,
        field: &'static str,
        value: String,
    },

    #[error("service '{0}' has a token exchange credential with an empty username")]
    EmptyUsername(String),

    #[error("service '{0}' has a token exchange credential with zero TTL")]
    ZeroTokenTtl(String),
}

/// Run every semantic check over `config`.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let positive: [(&'static str, u64); 6] = [
        ("timeouts.api_ms", config.timeouts.api_ms),
        ("timeouts.probe_ms", config.timeouts.probe_ms),
        ("governor.max_response_chars", config.governor.max_response_chars as u64),
        ("schedule.health_interval_secs", config.schedule.health_interval_secs),
        ("schedule.metrics_interval_secs", config.schedule.metrics_interval_secs),
        ("listener.request_timeout_secs", config.listener.request_timeout_secs),
    ];
    for (name, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    if !(1..=2).contains(&config.retries.max_attempts) {
        errors.push(ValidationError::RetryAttempts(config.retries.max_attempts));
    }

    let mut seen = HashSet::new();
    for (index, service) in config.services.iter().enumerate() {
        if service.id.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceId { index });
            continue;
        }
        if !seen.insert(service.id.as_str()) {
            errors.push(ValidationError::DuplicateService(service.id.clone()));
        }

        if Url::parse(&service.base_url).is_err() {
            errors.push(ValidationError::InvalidUrl {
                id: service.id.clone(),
                field: "base_url",
                value: service.base_url.clone(),
            });
        }
        if let Some(probe_url) = &service.probe_url {
            if Url::parse(probe_url).is_err() {
                errors.push(ValidationError::InvalidUrl {
                    id: service.id.clone(),
                    field: "probe_url",
                    value: probe_url.clone(),
                });
            }
        }

        if let CredentialConfig::TokenExchange {
            username,
            token_ttl_ms,
            ..
        } = &service.credential
        {
            if username.is_empty() {
                errors.push(ValidationError::EmptyUsername(service.id.clone()));
            }
            if *token_ttl_ms == 0 {
                errors.push(ValidationError::ZeroTokenTtl(service.id.clone()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
