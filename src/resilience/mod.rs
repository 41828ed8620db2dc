//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (bounded fetch: one attempt, deadline, closed outcome)
//!     → On transient outcome: retries.rs (one more attempt after backoff.rs delay)
//!     → Final outcome returned to the caller
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - At most two attempts per call; 401/403 is never retried
//! - The retry decision is a pure function; sleeping is injected

pub mod backoff;
pub mod retries;
pub mod timeouts;

#[cfg(test)]
pub(crate) mod testing;

pub use backoff::{Sleeper, TokioSleeper};
pub use retries::{RetryDecision, RetryPolicy, RetryingFetch};
pub use timeouts::{
    FatalFailure, FetchOutcome, FetchRequest, FetchResponse, HttpTransport, ReqwestTransport,
    RequestAuth, TransientFailure,
};
