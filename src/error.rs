//! Error taxonomy for upstream integration.
//!
//! Every failure is classified into exactly one [`ErrorClass`]. The class
//! drives retry eligibility and credential invalidation; the variant carries
//! the detail shown to downstream consumers.

use thiserror::Error;

/// Closed classification of integration failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Timeout, HTTP 429, HTTP 503. Eligible for the single retry.
    Transient,
    /// 401/403 or a failed credential exchange. Never retried.
    Authentication,
    /// Anything else. Surfaced immediately.
    Fatal,
}

/// Errors produced while talking to an upstream security service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntegrationError {
    /// The request did not complete within its deadline.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Upstream asked us to back off (429) or is briefly unavailable (503).
    #[error("upstream returned HTTP {status}")]
    TransientStatus { status: u16 },

    /// Upstream rejected our credentials.
    #[error("authentication rejected: HTTP {status}")]
    Unauthorized { status: u16 },

    /// Exchanging long-lived credentials for a token failed.
    #[error("authentication failed: {0}")]
    AuthExchange(String),

    /// The service requires credentials that were not configured.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// Any other non-2xx response.
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection refused, DNS failure, TLS failure, etc.
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// GraphQL endpoint answered with an `errors` array.
    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    /// Caller supplied an argument that failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No service with this id is configured.
    #[error("unknown service: {0}")]
    UnknownService(String),
}

impl IntegrationError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            IntegrationError::Timeout { .. } | IntegrationError::TransientStatus { .. } => {
                ErrorClass::Transient
            }
            IntegrationError::Unauthorized { .. }
            | IntegrationError::AuthExchange(_)
            | IntegrationError::MissingCredential(_) => ErrorClass::Authentication,
            _ => ErrorClass::Fatal,
        }
    }

    /// True when the credential used for the call must not be reused.
    pub fn invalidates_credential(&self) -> bool {
        matches!(self, IntegrationError::Unauthorized { .. })
    }
}

/// Result type for integration operations.
pub type IntegrationResult<T> = Result<T, IntegrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(IntegrationError::Timeout { timeout_ms: 10 }.class(), ErrorClass::Transient);
        assert_eq!(IntegrationError::TransientStatus { status: 429 }.class(), ErrorClass::Transient);
        assert_eq!(IntegrationError::Unauthorized { status: 401 }.class(), ErrorClass::Authentication);
        assert_eq!(IntegrationError::AuthExchange("x".into()).class(), ErrorClass::Authentication);
        assert_eq!(
            IntegrationError::Status { status: 404, body: String::new() }.class(),
            ErrorClass::Fatal
        );
        assert_eq!(IntegrationError::Network("refused".into()).class(), ErrorClass::Fatal);
    }

    #[test]
    fn test_error_display() {
        let err = IntegrationError::Status { status: 500, body: "boom".into() };
        assert_eq!(err.to_string(), "upstream returned HTTP 500: boom");

        let err = IntegrationError::Timeout { timeout_ms: 5000 };
        assert_eq!(err.to_string(), "request timed out after 5000 ms");
    }

    #[test]
    fn test_only_unauthorized_invalidates() {
        assert!(IntegrationError::Unauthorized { status: 403 }.invalidates_credential());
        assert!(!IntegrationError::AuthExchange("bad".into()).invalidates_credential());
        assert!(!IntegrationError::TransientStatus { status: 503 }.invalidates_credential());
    }
}
