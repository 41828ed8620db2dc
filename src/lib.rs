//! Matchbox gateway library.
//!
//! Resilient integration layer over a security-operations stack: bounded and
//! retrying upstream fetches, cached credentials, fan-out aggregation of
//! liveness and metrics, and response size governance.

// Upstream plumbing
pub mod auth;
pub mod error;
pub mod resilience;
pub mod services;

// Aggregation
pub mod aggregator;
pub mod governor;
pub mod health;

// Surfaces
pub mod http;
pub mod tools;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use error::{IntegrationError, IntegrationResult};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
