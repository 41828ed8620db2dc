//! Authenticated client for one upstream service.
//!
//! Resolves the service credential to a request header (looking up or
//! refreshing a cached token when the service uses a token exchange), issues
//! the call through the retrying or the bounded path, and drops a cached token
//! the upstream has rejected.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::auth::{BasicTokenExchange, CredentialCache};
use crate::config::{GatewayConfig, ServiceKind};
use crate::error::{IntegrationError, IntegrationResult};
use crate::observability::metrics;
use crate::resilience::{
    FatalFailure, FetchOutcome, FetchRequest, FetchResponse, HttpTransport, RequestAuth,
    RetryPolicy, RetryingFetch, Sleeper, TokioSleeper,
};
use crate::services::{Credential, ServiceEndpoint};

/// Which fetch path a call takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// Retrying Fetch. Only for requests that are safe to repeat.
    Retrying,
    /// Bounded Fetch, a single attempt. Used for state-changing requests.
    Bounded,
}

/// Timeouts and retry settings shared by every client.
#[derive(Clone)]
pub struct ClientSettings {
    pub policy: RetryPolicy,
    pub api_timeout: Duration,
    pub probe_timeout: Duration,
    pub sleeper: Arc<dyn Sleeper>,
}

impl ClientSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            policy: RetryPolicy::from_config(&config.retries),
            api_timeout: Duration::from_millis(config.timeouts.api_ms),
            probe_timeout: Duration::from_millis(config.timeouts.probe_ms),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

pub struct ServiceClient {
    endpoint: Arc<ServiceEndpoint>,
    retrying: RetryingFetch,
    bounded: Arc<dyn HttpTransport>,
    credentials: Arc<CredentialCache>,
    exchange: Option<BasicTokenExchange>,
    api_timeout: Duration,
    probe_timeout: Duration,
}

impl ServiceClient {
    pub fn new(
        endpoint: Arc<ServiceEndpoint>,
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<CredentialCache>,
        settings: ClientSettings,
    ) -> Self {
        let retrying = RetryingFetch::new(endpoint.id.clone(), transport.clone(), settings.policy)
            .with_sleeper(settings.sleeper.clone());

        let exchange = match &endpoint.credential {
            Credential::TokenExchange {
                username,
                password,
                auth_url,
                ttl,
            } => Some(BasicTokenExchange::new(
                auth_url.clone(),
                username.clone(),
                password.clone(),
                *ttl,
                settings.api_timeout,
                retrying.clone(),
            )),
            _ => None,
        };

        Self {
            endpoint,
            retrying,
            bounded: transport,
            credentials,
            exchange,
            api_timeout: settings.api_timeout,
            probe_timeout: settings.probe_timeout,
        }
    }

    pub fn id(&self) -> &str {
        &self.endpoint.id
    }

    pub fn kind(&self) -> ServiceKind {
        self.endpoint.kind
    }

    pub fn endpoint(&self) -> &Arc<ServiceEndpoint> {
        &self.endpoint
    }

    pub fn has_credential(&self) -> bool {
        self.endpoint.credential.is_configured()
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    pub fn url(&self, path: &str, query: &[(&str, String)]) -> IntegrationResult<Url> {
        self.endpoint.api_url(path, query)
    }

    async fn authorization(&self) -> IntegrationResult<Option<RequestAuth>> {
        match &self.endpoint.credential {
            Credential::None => Ok(None),
            Credential::Bearer(token) => Ok(Some(RequestAuth::Bearer(token.clone()))),
            Credential::TokenExchange { .. } => {
                let exchange = self.exchange.as_ref().ok_or_else(|| {
                    IntegrationError::MissingCredential(format!("{}: token exchange", self.id()))
                })?;
                let token = self.credentials.token(self.id(), exchange).await?;
                Ok(Some(RequestAuth::Bearer(token)))
            }
        }
    }

    /// Issue an authenticated request and return the 2xx response.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        mode: CallMode,
    ) -> IntegrationResult<FetchResponse> {
        self.send_within(method, url, body, mode, self.api_timeout).await
    }

    async fn send_within(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        mode: CallMode,
        deadline: Duration,
    ) -> IntegrationResult<FetchResponse> {
        let auth = self.authorization().await?;
        let mut request = FetchRequest::new(method, url, deadline).with_auth(auth.clone());
        if let Some(body) = body {
            request = request.with_json(body);
        }

        let outcome = self.dispatch(request, mode).await;

        if let FetchOutcome::Fatal(FatalFailure::Unauthorized { status }) = &outcome {
            if let (Some(_), Some(RequestAuth::Bearer(token))) = (&self.exchange, &auth) {
                tracing::warn!(service = %self.id(), status, "Upstream rejected cached token");
                self.credentials.invalidate(self.id(), token).await;
            }
        }
        outcome.into_result()
    }

    async fn dispatch(&self, request: FetchRequest, mode: CallMode) -> FetchOutcome {
        match mode {
            CallMode::Retrying => self.retrying.fetch(request).await,
            CallMode::Bounded => {
                let outcome = self.bounded.execute(request).await;
                metrics::record_upstream_request(self.id(), outcome.label());
                outcome
            }
        }
    }

    /// Authenticated GET, decoded as JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> IntegrationResult<T> {
        let url = self.url(path, query)?;
        self.send(Method::GET, url, None, CallMode::Retrying)
            .await?
            .json()
    }

    /// Authenticated GET with a per-call deadline in place of the API timeout.
    pub async fn get_json_within<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        deadline: Duration,
    ) -> IntegrationResult<T> {
        let url = self.url(path, query)?;
        self.send_within(Method::GET, url, None, CallMode::Retrying, deadline)
            .await?
            .json()
    }

    /// Authenticated POST with a JSON body, decoded as JSON.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
        mode: CallMode,
    ) -> IntegrationResult<T> {
        let url = self.url(path, &[])?;
        self.send(Method::POST, url, Some(body), mode).await?.json()
    }

    /// Unauthenticated GET for public status endpoints, on the probe deadline.
    pub async fn get_public<T: DeserializeOwned>(&self, path: &str) -> IntegrationResult<T> {
        let request = FetchRequest::get(self.url(path, &[])?, self.probe_timeout);
        self.dispatch(request, CallMode::Retrying)
            .await
            .into_result()?
            .json()
    }

    /// Single unauthenticated GET, returning the raw outcome.
    pub async fn reach(&self, path: &str) -> IntegrationResult<FetchOutcome> {
        let request = FetchRequest::get(self.url(path, &[])?, self.probe_timeout);
        Ok(self.dispatch(request, CallMode::Bounded).await)
    }
}
