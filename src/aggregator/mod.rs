//! Aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! Trigger (HTTP request or StatusMonitor tick)
//!     → liveness.rs: probe each service (no retry, no redirects)
//!     → metrics.rs: collect each service (credential cache + retrying fetch)
//!     → settle.rs: join all calls on the current task, one result per key
//!     → AggregateResult (one entry per configured service)
//! ```
//!
//! # Design Decisions
//! - No state is kept between runs; scheduling lives in `health::active`
//! - A failing service yields an `error` or `offline` entry, never a missing key

pub mod liveness;
pub mod metrics;
pub mod settle;

pub use liveness::LivenessAggregator;
pub use metrics::{MetricsAggregator, MetricsCollector};
pub use settle::settle_all;
