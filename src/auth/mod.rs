//! Credential subsystem.
//!
//! # Data Flow
//! ```text
//! Caller needs a token for service S
//!     → cache.rs (slot for S: valid token? return it)
//!     → otherwise TokenExchange (one auth call via RetryingFetch)
//!     → token.rs (CachedToken with expiry = now + TTL)
//!
//! Data call answered 401/403
//!     → cache.rs invalidate(S, rejected) → next call re-authenticates
//! ```

pub mod cache;
pub mod token;

pub use cache::{BasicTokenExchange, CredentialCache, TokenExchange};
pub use token::{CachedToken, Clock, ManualClock, SystemClock};
