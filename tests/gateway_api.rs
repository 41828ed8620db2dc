//! HTTP gateway routes end to end.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use matchbox_gateway::aggregator::{LivenessAggregator, MetricsAggregator};
use matchbox_gateway::config::GatewayConfig;
use matchbox_gateway::health::StatusMonitor;
use matchbox_gateway::http::{AppState, GatewayServer};
use matchbox_gateway::lifecycle::Shutdown;
use matchbox_gateway::services::ServiceRegistry;
use serde_json::{json, Value};

mod common;

async fn start_gateway(config: GatewayConfig, shutdown: &Shutdown) -> SocketAddr {
    let registry = Arc::new(ServiceRegistry::from_config(&config).unwrap());
    let liveness = Arc::new(LivenessAggregator::new(
        registry.clone(),
        Duration::from_millis(config.timeouts.probe_ms),
    ));
    let metrics = Arc::new(MetricsAggregator::new(registry.clone()));
    let monitor = StatusMonitor::new(liveness.clone(), metrics.clone(), config.schedule.clone());
    let state = AppState::new(&registry, liveness, metrics, monitor.snapshot());
    tokio::spawn(monitor.run(shutdown.subscribe()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GatewayServer::new(&config, state);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    addr
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

fn grafana_upstream(req: common::MockRequest) -> (u16, String) {
    match req.path() {
        "/api/health" => (200, json!({ "version": "10.4.1", "database": "ok" }).to_string()),
        "/api/search" => (200, "[]".to_string()),
        "/api/status" => (200, json!({ "versions": { "Cortex": "3.1.8" } }).to_string()),
        _ => (200, "{}".to_string()),
    }
}

#[tokio::test]
async fn test_health_route_lists_every_service() {
    let upstream = common::start_programmable_upstream(|req| async move { grafana_upstream(req) }).await;
    let shutdown = Shutdown::new();
    let addr = start_gateway(common::config_for(&upstream.url()), &shutdown).await;

    let res = client().get(format!("http://{addr}/api/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    for id in ["wazuh", "grafana", "opencti", "thehive", "cortex"] {
        assert_eq!(body[id]["status"], "online", "{id}");
    }
    shutdown.trigger();
}

#[tokio::test]
async fn test_single_service_route_status_codes() {
    let upstream = common::start_programmable_upstream(|req| async move { grafana_upstream(req) }).await;
    let dead = common::closed_addr().await;
    let mut config = common::config_for(&upstream.url());
    config.service_mut("thehive").unwrap().base_url = format!("http://{dead}");
    let shutdown = Shutdown::new();
    let addr = start_gateway(config, &shutdown).await;
    let client = client();

    let res = client.get(format!("http://{addr}/api/grafana")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["version"], "10.4.1");
    assert_eq!(body["dashboards"], 0);

    let res = client.get(format!("http://{addr}/api/thehive")).send().await.unwrap();
    assert_eq!(res.status(), 502);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "offline");

    let res = client.get(format!("http://{addr}/api/splunk")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");
    shutdown.trigger();
}

#[tokio::test]
async fn test_services_catalogue() {
    let upstream = common::start_mock_upstream(200, "{}").await;
    let shutdown = Shutdown::new();
    let addr = start_gateway(common::config_for(&upstream.url()), &shutdown).await;

    let body: Value = client()
        .get(format!("http://{addr}/api/services"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let services = body.as_array().unwrap();
    assert_eq!(services.len(), 5);
    assert_eq!(services[1]["id"], "grafana");
    assert_eq!(services[1]["embeddable"], true);
    assert!(services[1]["dashboardUrl"].is_string());
    shutdown.trigger();
}

#[tokio::test]
async fn test_status_snapshot_fills_in() {
    let upstream = common::start_programmable_upstream(|req| async move { grafana_upstream(req) }).await;
    let shutdown = Shutdown::new();
    let addr = start_gateway(common::config_for(&upstream.url()), &shutdown).await;
    let client = client();

    let mut body = Value::Null;
    for _ in 0..50 {
        body = client
            .get(format!("http://{addr}/api/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if !body["healthUpdatedAt"].is_null() && !body["metricsUpdatedAt"].is_null() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(body["health"]["grafana"]["status"], "online");
    assert_eq!(body["metrics"]["grafana"]["version"], "10.4.1");
    shutdown.trigger();
}
