//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with the gateway routes
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and stop on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::aggregator::{LivenessAggregator, MetricsAggregator};
use crate::config::GatewayConfig;
use crate::health::active::SnapshotHandle;
use crate::http::response::{report_response, ApiError};
use crate::services::ServiceRegistry;

/// Catalogue row served by `/api/services`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    pub role: String,
    pub badge: String,
    pub dashboard_url: String,
    pub embeddable: bool,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub liveness: Arc<LivenessAggregator>,
    pub metrics: Arc<MetricsAggregator>,
    pub snapshot: SnapshotHandle,
    pub catalogue: Arc<Vec<ServiceInfo>>,
}

impl AppState {
    pub fn new(
        registry: &ServiceRegistry,
        liveness: Arc<LivenessAggregator>,
        metrics: Arc<MetricsAggregator>,
        snapshot: SnapshotHandle,
    ) -> Self {
        let catalogue = registry
            .iter()
            .map(|handle| {
                let endpoint = handle.endpoint();
                ServiceInfo {
                    id: endpoint.id.clone(),
                    name: endpoint.catalog.name.clone(),
                    role: endpoint.catalog.role.clone(),
                    badge: endpoint.catalog.badge.clone(),
                    dashboard_url: endpoint.catalog.dashboard_url.clone(),
                    embeddable: endpoint.catalog.embeddable,
                }
            })
            .collect();
        Self {
            liveness,
            metrics,
            snapshot,
            catalogue: Arc::new(catalogue),
        }
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(config: &GatewayConfig, state: AppState) -> Self {
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/api/health", get(health_handler))
            .route("/api/metrics", get(metrics_handler))
            .route("/api/status", get(status_handler))
            .route("/api/services", get(services_handler))
            .route("/api/{service}", get(service_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.liveness.run().await)
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.run().await)
}

async fn service_handler(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<Response, ApiError> {
    let report = state
        .metrics
        .run_one(&service)
        .await
        .ok_or_else(|| ApiError::not_found(format!("unknown service: {service}")))?;
    Ok(report_response(report))
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.snapshot.load().as_ref().clone())
}

async fn services_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.catalogue.as_ref().clone())
}
