//! Scheduled status refresh.
//!
//! # Responsibilities
//! - Run liveness aggregation every `health_interval_secs`
//! - Run metrics aggregation every `metrics_interval_secs`
//! - Publish the latest results as an atomically swapped snapshot

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time;

use crate::aggregator::{LivenessAggregator, MetricsAggregator};
use crate::config::ScheduleConfig;
use crate::health::state::AggregateResult;

/// Latest results published by the monitor.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub health: Option<AggregateResult>,
    pub metrics: Option<AggregateResult>,
    /// Milliseconds since epoch of the last liveness run.
    pub health_updated_at: Option<u64>,
    /// Milliseconds since epoch of the last metrics run.
    pub metrics_updated_at: Option<u64>,
}

/// Read side of the monitor's snapshot.
#[derive(Clone)]
pub struct SnapshotHandle {
    inner: Arc<ArcSwap<StatusSnapshot>>,
}

impl Default for SnapshotHandle {
    fn default() -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(StatusSnapshot::default())),
        }
    }
}

impl SnapshotHandle {
    pub fn load(&self) -> Arc<StatusSnapshot> {
        self.inner.load_full()
    }

    fn update(&self, f: impl Fn(&StatusSnapshot) -> StatusSnapshot) {
        self.inner.rcu(|current| f(current));
    }
}

pub struct StatusMonitor {
    liveness: Arc<LivenessAggregator>,
    metrics: Arc<MetricsAggregator>,
    config: ScheduleConfig,
    snapshot: SnapshotHandle,
}

impl StatusMonitor {
    pub fn new(
        liveness: Arc<LivenessAggregator>,
        metrics: Arc<MetricsAggregator>,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            liveness,
            metrics,
            config,
            snapshot: SnapshotHandle::default(),
        }
    }

    pub fn snapshot(&self) -> SnapshotHandle {
        self.snapshot.clone()
    }

    /// Run both schedules until shutdown. A slow metrics pass never holds
    /// back liveness, and the reverse.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Scheduled status refresh disabled");
            return;
        }

        tracing::info!(
            health_interval = self.config.health_interval_secs,
            metrics_interval = self.config.metrics_interval_secs,
            "Status monitor starting"
        );

        let health_period = Duration::from_secs(self.config.health_interval_secs);
        let metrics_period = Duration::from_secs(self.config.metrics_interval_secs);
        let this = &self;
        tokio::join!(
            scheduled("health", health_period, shutdown.resubscribe(), || this.refresh_health()),
            scheduled("metrics", metrics_period, shutdown, || this.refresh_metrics()),
        );
    }

    pub async fn refresh_health(&self) {
        let result = self.liveness.run().await;
        tracing::debug!(
            online = result.online_count(),
            total = result.len(),
            "Liveness refreshed"
        );
        let now = now_millis();
        self.snapshot.update(|current| StatusSnapshot {
            health: Some(result.clone()),
            health_updated_at: Some(now),
            ..current.clone()
        });
    }

    pub async fn refresh_metrics(&self) {
        let result = self.metrics.run().await;
        tracing::debug!(
            online = result.online_count(),
            total = result.len(),
            "Metrics refreshed"
        );
        let now = now_millis();
        self.snapshot.update(|current| StatusSnapshot {
            metrics: Some(result.clone()),
            metrics_updated_at: Some(now),
            ..current.clone()
        });
    }
}

async fn scheduled<F, Fut>(
    schedule: &'static str,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
    mut refresh: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = async {
                ticker.tick().await;
                refresh().await;
            } => {}
            _ = shutdown.recv() => {
                tracing::info!(schedule, "Status monitor received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
