//! Per-service credential cache.
//!
//! # States (per service)
//! ```text
//! Unauthenticated ──exchange ok──▶ Authenticated
//!       ▲                               │
//!       └──── now >= expires_at, or ────┘
//!             token rejected (401/403)
//! ```
//!
//! Refresh happens lazily inside [`CredentialCache::token`]; there is no
//! background timer. Each service slot sits behind an async mutex that is held
//! across the exchange call, so callers that find the token expired at the
//! same moment share a single in-flight refresh.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::auth::token::{CachedToken, Clock, SystemClock};
use crate::error::{IntegrationError, IntegrationResult};
use crate::observability::metrics;
use crate::resilience::{FetchRequest, RetryingFetch};

/// Exchanges long-lived credentials for a short-lived token.
pub trait TokenExchange: Send + Sync {
    /// Perform one authentication call.
    fn exchange(&self) -> BoxFuture<'_, IntegrationResult<String>>;

    /// How long a fresh token is reused.
    fn ttl(&self) -> Duration;
}

#[derive(Default)]
struct TokenSlot {
    token: Mutex<Option<CachedToken>>,
}

/// Keyed store of cached tokens. One slot per service id, never shared.
pub struct CredentialCache {
    slots: DashMap<String, Arc<TokenSlot>>,
    clock: Arc<dyn Clock>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: DashMap::new(),
            clock,
        }
    }

    fn slot(&self, service: &str) -> Arc<TokenSlot> {
        self.slots
            .entry(service.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Return a valid token for `service`, authenticating first if needed.
    pub async fn token(&self, service: &str, exchange: &dyn TokenExchange) -> IntegrationResult<String> {
        let slot = self.slot(service);
        let mut cached = slot.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_valid_at(self.clock.now_millis()) {
                return Ok(token.value.clone());
            }
            tracing::debug!(service = %service, "Cached token expired");
        }
        *cached = None;

        match exchange.exchange().await {
            Ok(value) => {
                let token = CachedToken::issued(value, self.clock.now_millis(), exchange.ttl());
                tracing::info!(
                    service = %service,
                    expires_at_ms = token.expires_at_ms,
                    "Obtained new upstream token"
                );
                metrics::record_token_refresh(service, true);
                let value = token.value.clone();
                *cached = Some(token);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(service = %service, error = %e, "Token exchange failed");
                metrics::record_token_refresh(service, false);
                Err(match e {
                    IntegrationError::AuthExchange(_) | IntegrationError::MissingCredential(_) => e,
                    other => IntegrationError::AuthExchange(other.to_string()),
                })
            }
        }
    }

    /// Drop the cached token if it is still `rejected`.
    ///
    /// A token that was refreshed in the meantime by another caller is kept.
    pub async fn invalidate(&self, service: &str, rejected: &str) {
        let slot = self.slot(service);
        let mut cached = slot.token.lock().await;
        if cached.as_ref().is_some_and(|t| t.value == rejected) {
            tracing::info!(service = %service, "Invalidating rejected upstream token");
            *cached = None;
        }
    }

    /// Whether `service` currently holds a token that is valid now.
    pub async fn is_authenticated(&self, service: &str) -> bool {
        let slot = self.slot(service);
        let cached = slot.token.lock().await;
        let now = self.clock.now_millis();
        cached.as_ref().is_some_and(|t| t.is_valid_at(now))
    }
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct AuthEnvelope {
    data: AuthData,
}

#[derive(Deserialize)]
struct AuthData {
    token: String,
}

/// Basic-auth → token exchange answering `{"data": {"token": "..."}}`.
pub struct BasicTokenExchange {
    auth_url: Url,
    username: String,
    password: String,
    ttl: Duration,
    timeout: Duration,
    fetch: RetryingFetch,
}

impl BasicTokenExchange {
    pub fn new(
        auth_url: Url,
        username: String,
        password: String,
        ttl: Duration,
        timeout: Duration,
        fetch: RetryingFetch,
    ) -> Self {
        Self {
            auth_url,
            username,
            password,
            ttl,
            timeout,
            fetch,
        }
    }

    async fn authenticate(&self) -> IntegrationResult<String> {
        let request = FetchRequest::new(reqwest::Method::POST, self.auth_url.clone(), self.timeout)
            .basic(self.username.clone(), self.password.clone());

        let response = self
            .fetch
            .fetch(request)
            .await
            .into_result()
            .map_err(|e| IntegrationError::AuthExchange(e.to_string()))?;

        let envelope: AuthEnvelope = response
            .json()
            .map_err(|e| IntegrationError::AuthExchange(e.to_string()))?;
        if envelope.data.token.is_empty() {
            return Err(IntegrationError::AuthExchange("empty token in response".into()));
        }
        Ok(envelope.data.token)
    }
}

impl TokenExchange for BasicTokenExchange {
    fn exchange(&self) -> BoxFuture<'_, IntegrationResult<String>> {
        Box::pin(self.authenticate())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::ManualClock;
    use crate::resilience::testing::{RecordingSleeper, ScriptedTransport};
    use crate::resilience::{FetchOutcome, RetryPolicy};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const T: u64 = 1_700_000_000_000;

    struct CountingExchange {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingExchange {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenExchange for CountingExchange {
        fn exchange(&self) -> BoxFuture<'_, IntegrationResult<String>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let fail = self.fail;
            Box::pin(async move {
                // Yield so concurrent callers pile up on the slot.
                tokio::task::yield_now().await;
                if fail {
                    Err(IntegrationError::AuthExchange("HTTP 401".into()))
                } else {
                    Ok(format!("token-{n}"))
                }
            })
        }

        fn ttl(&self) -> Duration {
            Duration::from_millis(850_000)
        }
    }

    #[tokio::test]
    async fn test_token_reused_until_ttl() {
        let clock = Arc::new(ManualClock::new(T));
        let cache = CredentialCache::with_clock(clock.clone());
        let exchange = CountingExchange::new();

        assert_eq!(cache.token("wazuh", &exchange).await.unwrap(), "token-1");

        clock.set(T + 849_999);
        assert_eq!(cache.token("wazuh", &exchange).await.unwrap(), "token-1");
        assert_eq!(exchange.calls(), 1);

        clock.set(T + 850_001);
        assert_eq!(cache.token("wazuh", &exchange).await.unwrap(), "token-2");
        assert_eq!(exchange.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_caches_nothing() {
        let cache = CredentialCache::with_clock(Arc::new(ManualClock::new(T)));
        let mut exchange = CountingExchange::new();
        exchange.fail = true;

        let err = cache.token("wazuh", &exchange).await.unwrap_err();
        assert!(matches!(err, IntegrationError::AuthExchange(_)));
        assert!(!cache.is_authenticated("wazuh").await);

        assert!(cache.token("wazuh", &exchange).await.is_err());
        assert_eq!(exchange.calls(), 2);
    }

    #[tokio::test]
    async fn test_tokens_are_per_service() {
        let cache = CredentialCache::with_clock(Arc::new(ManualClock::new(T)));
        let a = CountingExchange::new();
        let b = CountingExchange::new();

        cache.token("a", &a).await.unwrap();
        cache.token("b", &b).await.unwrap();
        cache.token("a", &a).await.unwrap();

        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let cache = CredentialCache::with_clock(Arc::new(ManualClock::new(T)));
        let exchange = CountingExchange::new();

        let results = futures_util::future::join_all(
            (0..8).map(|_| cache.token("wazuh", &exchange)),
        )
        .await;

        assert!(results.iter().all(|r| r.as_deref() == Ok("token-1")));
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_only_drops_rejected_token() {
        let cache = CredentialCache::with_clock(Arc::new(ManualClock::new(T)));
        let exchange = CountingExchange::new();

        let token = cache.token("wazuh", &exchange).await.unwrap();
        cache.invalidate("wazuh", "some-older-token").await;
        assert!(cache.is_authenticated("wazuh").await);

        cache.invalidate("wazuh", &token).await;
        assert!(!cache.is_authenticated("wazuh").await);
        assert_eq!(cache.token("wazuh", &exchange).await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_basic_exchange_parses_token() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            FetchOutcome::from_status(503, String::new()),
            ScriptedTransport::ok_json(serde_json::json!({"data": {"token": "jwt"}})),
        ]));
        let fetch = RetryingFetch::new("wazuh", transport.clone(), RetryPolicy::default())
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        let exchange = BasicTokenExchange::new(
            Url::parse("https://wazuh.test:55000/security/user/authenticate").unwrap(),
            "wazuh-wui".into(),
            "pw".into(),
            Duration::from_millis(850_000),
            Duration::from_secs(10),
            fetch,
        );

        assert_eq!(exchange.exchange().await.unwrap(), "jwt");
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, reqwest::Method::POST);
        assert!(matches!(
            requests[0].auth,
            Some(crate::resilience::RequestAuth::Basic { ref username, .. }) if username == "wazuh-wui"
        ));
    }

    #[tokio::test]
    async fn test_basic_exchange_rejects_bad_credentials() {
        let transport = Arc::new(ScriptedTransport::new(vec![FetchOutcome::from_status(
            401,
            String::new(),
        )]));
        let fetch = RetryingFetch::new("wazuh", transport.clone(), RetryPolicy::default());
        let exchange = BasicTokenExchange::new(
            Url::parse("https://wazuh.test/auth").unwrap(),
            "u".into(),
            "p".into(),
            Duration::from_secs(1),
            Duration::from_secs(1),
            fetch,
        );

        let err = exchange.exchange().await.unwrap_err();
        assert!(matches!(err, IntegrationError::AuthExchange(ref m) if m.contains("401")));
        assert_eq!(transport.calls(), 1);
    }
}
