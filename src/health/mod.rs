//! Status subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduled refresh (active.rs):
//!     30 s timer → LivenessAggregator → snapshot.health
//!     60 s timer → MetricsAggregator  → snapshot.metrics
//!
//! Reports (state.rs):
//!     ServiceReport { online | offline | error } per service
//!     AggregateResult: one report per configured service
//! ```
//!
//! # Design Decisions
//! - Readers never block the monitor (ArcSwap snapshot)
//! - The monitor only schedules; aggregators hold no state between runs

pub mod active;
pub mod state;

pub use active::{SnapshotHandle, StatusMonitor, StatusSnapshot};
pub use state::{AggregateResult, ServiceReport, ServiceStatus};
