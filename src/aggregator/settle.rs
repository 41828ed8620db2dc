//! Settle-all fan-out.

use std::future::Future;

use futures_util::future::join_all;

/// Drive every keyed future to completion concurrently on the current task.
///
/// Returns one result per key, in input order. A failing future never
/// cancels its siblings.
pub async fn settle_all<K, T, E, F, I>(calls: I) -> Vec<(K, Result<T, E>)>
where
    I: IntoIterator<Item = (K, F)>,
    F: Future<Output = Result<T, E>>,
{
    let (keys, futures): (Vec<K>, Vec<F>) = calls.into_iter().unzip();
    let results = join_all(futures).await;
    keys.into_iter().zip(results).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::BoxFuture;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let calls = vec![
            ("a", Box::pin(async { Ok(1) }) as BoxFuture<'static, Result<i32, String>>),
            ("b", Box::pin(async { Err("boom".to_string()) })),
            ("c", Box::pin(async { Ok(3) })),
        ];
        let results = settle_all(calls).await;
        assert_eq!(
            results,
            vec![("a", Ok(1)), ("b", Err("boom".to_string())), ("c", Ok(3))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_run_concurrently() {
        let start = Instant::now();
        let calls = (1..=3u64).map(|n| {
            (n, async move {
                tokio::time::sleep(Duration::from_secs(n)).await;
                Ok::<_, ()>(n * 10)
            })
        });
        let results = settle_all(calls).await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(n, r)| *r == Ok(n * 10)));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results: Vec<(u8, Result<u8, ()>)> =
            settle_all(Vec::<(u8, std::future::Ready<Result<u8, ()>>)>::new()).await;
        assert!(results.is_empty());
    }
}
