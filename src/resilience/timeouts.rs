//! Bounded fetch: one outbound HTTP call with a deadline.
//!
//! # Responsibilities
//! - Issue exactly one request per call, never retrying
//! - Cancel the call (including body read) once its deadline passes
//! - Classify the result into a closed [`FetchOutcome`]
//!
//! Timed-out calls are transient; see `retries.rs` for what happens next.

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::redirect::Policy;
use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{IntegrationError, IntegrationResult};

/// Statuses classified as transient.
const TRANSIENT_STATUSES: [u16; 2] = [429, 503];

/// Upper bound on how much of an error body is kept for messages.
const ERROR_BODY_LIMIT: usize = 200;

/// Authentication attached to a request.
#[derive(Clone, PartialEq, Eq)]
pub enum RequestAuth {
    Bearer(String),
    Basic { username: String, password: String },
}

impl std::fmt::Debug for RequestAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestAuth::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            RequestAuth::Basic { username, .. } => write!(f, "Basic({username}, <redacted>)"),
        }
    }
}

/// Everything needed to issue one request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub auth: Option<RequestAuth>,
    pub json_body: Option<serde_json::Value>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url, timeout: Duration) -> Self {
        Self {
            method,
            url,
            auth: None,
            json_body: None,
            timeout,
        }
    }

    pub fn get(url: Url, timeout: Duration) -> Self {
        Self::new(Method::GET, url, timeout)
    }

    pub fn post_json(url: Url, body: serde_json::Value, timeout: Duration) -> Self {
        Self::new(Method::POST, url, timeout).with_json(body)
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.json_body = Some(body);
        self
    }

    pub fn with_auth(mut self, auth: Option<RequestAuth>) -> Self {
        self.auth = auth;
        self
    }

    pub fn bearer(self, token: impl Into<String>) -> Self {
        self.with_auth(Some(RequestAuth::Bearer(token.into())))
    }

    pub fn basic(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.with_auth(Some(RequestAuth::Basic {
            username: username.into(),
            password: password.into(),
        }))
    }
}

/// A completed exchange with a 2xx status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> IntegrationResult<T> {
        serde_json::from_str(&self.body).map_err(|e| IntegrationError::Malformed(e.to_string()))
    }
}

/// Failure eligible for the single retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientFailure {
    Status { status: u16, body: String },
    Timeout { timeout_ms: u64 },
}

/// Failure surfaced immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalFailure {
    Unauthorized { status: u16 },
    Status { status: u16, body: String },
    Network(String),
}

/// Result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(FetchResponse),
    Transient(TransientFailure),
    Fatal(FatalFailure),
}

impl FetchOutcome {
    /// Classify a received HTTP answer.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            200..=299 => FetchOutcome::Success(FetchResponse { status, body }),
            401 | 403 => FetchOutcome::Fatal(FatalFailure::Unauthorized { status }),
            s if TRANSIENT_STATUSES.contains(&s) => {
                FetchOutcome::Transient(TransientFailure::Status { status, body })
            }
            _ => FetchOutcome::Fatal(FatalFailure::Status { status, body }),
        }
    }

    /// HTTP status if the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchOutcome::Success(resp) => Some(resp.status),
            FetchOutcome::Transient(TransientFailure::Status { status, .. }) => Some(*status),
            FetchOutcome::Fatal(FatalFailure::Unauthorized { status }) => Some(*status),
            FetchOutcome::Fatal(FatalFailure::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Success(_) => "success",
            FetchOutcome::Transient(TransientFailure::Timeout { .. }) => "timeout",
            FetchOutcome::Transient(_) => "transient",
            FetchOutcome::Fatal(FatalFailure::Unauthorized { .. }) => "unauthorized",
            FetchOutcome::Fatal(FatalFailure::Network(_)) => "network",
            FetchOutcome::Fatal(_) => "fatal",
        }
    }

    /// Convert into a response or a classified error.
    pub fn into_result(self) -> IntegrationResult<FetchResponse> {
        match self {
            FetchOutcome::Success(resp) => Ok(resp),
            FetchOutcome::Transient(TransientFailure::Status { status, .. }) => {
                Err(IntegrationError::TransientStatus { status })
            }
            FetchOutcome::Transient(TransientFailure::Timeout { timeout_ms }) => {
                Err(IntegrationError::Timeout { timeout_ms })
            }
            FetchOutcome::Fatal(FatalFailure::Unauthorized { status }) => {
                Err(IntegrationError::Unauthorized { status })
            }
            FetchOutcome::Fatal(FatalFailure::Status { status, body }) => {
                Err(IntegrationError::Status {
                    status,
                    body: truncate_body(&body),
                })
            }
            FetchOutcome::Fatal(FatalFailure::Network(msg)) => Err(IntegrationError::Network(msg)),
        }
    }
}

fn truncate_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

/// Anything that can execute a single request.
pub trait HttpTransport: Send + Sync {
    fn execute(&self, request: FetchRequest) -> BoxFuture<'_, FetchOutcome>;
}

/// Bounded fetch over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport.
    ///
    /// `follow_redirects` is off for liveness probes so a 3xx is observed as-is.
    pub fn new(accept_invalid_certs: bool, follow_redirects: bool) -> IntegrationResult<Self> {
        let redirect = if follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .redirect(redirect)
            .user_agent(concat!("matchbox-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IntegrationError::Network(format!("client build failed: {e}")))?;
        Ok(Self { client })
    }

    async fn send(&self, request: FetchRequest) -> FetchOutcome {
        let timeout = request.timeout;
        let timeout_ms = timeout.as_millis() as u64;

        let mut builder = self.client.request(request.method, request.url);
        builder = match request.auth {
            Some(RequestAuth::Bearer(token)) => builder.bearer_auth(token),
            Some(RequestAuth::Basic { username, password }) => {
                builder.basic_auth(username, Some(password))
            }
            None => builder,
        };
        if let Some(body) = request.json_body {
            builder = builder.json(&body);
        }

        let exchange = async move {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok((status, body))) => FetchOutcome::from_status(status, body),
            Ok(Err(e)) if e.is_timeout() => {
                FetchOutcome::Transient(TransientFailure::Timeout { timeout_ms })
            }
            Ok(Err(e)) => FetchOutcome::Fatal(FatalFailure::Network(e.to_string())),
            Err(_) => FetchOutcome::Transient(TransientFailure::Timeout { timeout_ms }),
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: FetchRequest) -> BoxFuture<'_, FetchOutcome> {
        Box::pin(self.send(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            FetchOutcome::from_status(200, "{}".into()),
            FetchOutcome::Success(_)
        ));
        assert!(matches!(
            FetchOutcome::from_status(429, String::new()),
            FetchOutcome::Transient(TransientFailure::Status { status: 429, .. })
        ));
        assert!(matches!(
            FetchOutcome::from_status(503, String::new()),
            FetchOutcome::Transient(_)
        ));
        assert_eq!(
            FetchOutcome::from_status(401, String::new()),
            FetchOutcome::Fatal(FatalFailure::Unauthorized { status: 401 })
        );
        assert!(matches!(
            FetchOutcome::from_status(502, String::new()),
            FetchOutcome::Fatal(FatalFailure::Status { status: 502, .. })
        ));
        assert!(matches!(
            FetchOutcome::from_status(302, String::new()),
            FetchOutcome::Fatal(FatalFailure::Status { status: 302, .. })
        ));
    }

    #[test]
    fn test_into_result_truncates_error_body() {
        let body = "x".repeat(1000);
        let err = FetchOutcome::from_status(500, body).into_result().unwrap_err();
        match err {
            IntegrationError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), ERROR_BODY_LIMIT);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_auth_debug_is_redacted() {
        let req = FetchRequest::get(Url::parse("http://x/").unwrap(), Duration::from_secs(1))
            .basic("admin", "topsecret");
        assert!(!format!("{:?}", req).contains("topsecret"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fatal_network() {
        let transport = ReqwestTransport::new(false, true).unwrap();
        // Port 9 (discard) on localhost is almost never listening.
        let req = FetchRequest::get(
            Url::parse("http://127.0.0.1:9/").unwrap(),
            Duration::from_secs(2),
        );
        let outcome = transport.execute(req).await;
        assert!(matches!(
            outcome,
            FetchOutcome::Fatal(FatalFailure::Network(_))
                | FetchOutcome::Transient(TransientFailure::Timeout { .. })
        ));
    }
}
