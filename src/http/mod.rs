//! HTTP gateway subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum router, request ID, trace, timeout)
//!     → aggregators (live run) or status snapshot
//!     → response.rs (200 / 502 / 404 mapping)
//!     → JSON to the dashboard
//! ```

pub mod response;
pub mod server;

pub use response::{report_response, ApiError};
pub use server::{AppState, GatewayServer, ServiceInfo};
