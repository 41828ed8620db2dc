//! Fixed linear backoff and the sleep seam.

use std::time::Duration;

use futures_util::future::BoxFuture;

/// Delay before the attempt following `attempt` (1-based): `base * attempt`.
pub fn calculate_backoff(attempt: u32, base_ms: u64) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(u64::from(attempt)))
}

/// Suspends the caller; injected so retry timing can be observed in tests.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Sleeps on the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 1000), Duration::ZERO);
        assert_eq!(calculate_backoff(1, 1000), Duration::from_secs(1));
        assert_eq!(calculate_backoff(2, 1000), Duration::from_secs(2));
        assert_eq!(calculate_backoff(u32::MAX, u64::MAX), Duration::from_millis(u64::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper_waits() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_secs(1)).await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
