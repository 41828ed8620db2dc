//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → env.rs (environment overlay: base URLs, secrets)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → ServiceEndpoint values built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_config, resolve_path, ConfigError};
pub use schema::{
    CatalogEntry, CredentialConfig, GatewayConfig, GovernorConfig, ListenerConfig, LivenessPolicy,
    LogFormat, ObservabilityConfig, RetryConfig, ScheduleConfig, ServiceConfig, ServiceKind,
    TimeoutConfig,
};
