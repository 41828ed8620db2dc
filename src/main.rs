//! Matchbox gateway.
//!
//! ```text
//!                  ┌───────────────────────────────────────────────┐
//!   Dashboard      │                    GATEWAY                     │
//!  ───────────────▶│  http::server ──▶ aggregator ──▶ services      │──▶ Wazuh
//!                  │        ▲         liveness +     client         │──▶ Grafana
//!                  │        │         metrics        + auth cache   │──▶ OpenCTI
//!                  │   health::active (scheduled snapshot)          │──▶ TheHive
//!                  │                                                │──▶ Cortex
//!                  │  resilience: bounded fetch / single retry      │
//!                  │  governor: response ceiling                    │
//!                  └───────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use matchbox_gateway::aggregator::{LivenessAggregator, MetricsAggregator};
use matchbox_gateway::health::StatusMonitor;
use matchbox_gateway::http::{AppState, GatewayServer};
use matchbox_gateway::lifecycle::signals::spawn_signal_handler;
use matchbox_gateway::lifecycle::Shutdown;
use matchbox_gateway::observability::logging::{self, LogTarget};
use matchbox_gateway::observability::metrics::init_metrics;
use matchbox_gateway::services::ServiceRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = matchbox_gateway::config::load(None)?;

    logging::init(
        &config.observability.log_level,
        config.observability.log_format,
        LogTarget::Stdout,
    )?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "matchbox-gateway starting");
    let config_path = matchbox_gateway::config::resolve_path(None);
    tracing::info!(
        path = ?config_path,
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        api_timeout_ms = config.timeouts.api_ms,
        probe_timeout_ms = config.timeouts.probe_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                init_metrics(addr)?;
                tracing::info!(address = %addr, "Metrics endpoint listening");
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(ServiceRegistry::from_config(&config)?);
    let liveness = Arc::new(LivenessAggregator::new(
        registry.clone(),
        Duration::from_millis(config.timeouts.probe_ms),
    ));
    let metrics = Arc::new(MetricsAggregator::new(registry.clone()));

    let monitor = StatusMonitor::new(liveness.clone(), metrics.clone(), config.schedule.clone());
    let state = AppState::new(&registry, liveness, metrics, monitor.snapshot());

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());
    let monitor_task = tokio::spawn(monitor.run(shutdown.subscribe()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = GatewayServer::new(&config, state);
    server.run(listener, shutdown.subscribe()).await?;

    if let Err(e) = monitor_task.await {
        tracing::warn!(error = %e, "Status monitor task ended abnormally");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
