use std::future::Future;

use anyhow::Result;
use tokio::time::{Duration, Instant, sleep};

use crate::models::{Failure, RunResult};

/// Fixed pause between attempts.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(1000);

/// Repeats `operation` until it succeeds or `timeout` has elapsed.
///
/// Attempts are strictly sequential. Each error is absorbed and logged as a
/// warning naming `label`; once the deadline is crossed no further attempt
/// starts and the outcome is `Failure::Timeout` rather than the last error.
pub async fn retry_on_error<T, F, Fut>(
    mut operation: F,
    timeout: Duration,
    label: Option<&str>,
) -> RunResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let label = label.unwrap_or("anonymous");
    let start = Instant::now();
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if start.elapsed() >= timeout {
                    return Err(Failure::Timeout);
                }
                tracing::warn!("{}: a recoverable error has occurred: {:#}", label, err);
            }
        }
        sleep(RETRY_BACKOFF).await;
        if start.elapsed() >= timeout {
            return Err(Failure::Timeout);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use anyhow::anyhow;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn returns_first_success_without_waiting() {
        let calls = Cell::new(0u32);
        let start = Instant::now();
        let result = retry_on_error(
            || {
                calls.set(calls.get() + 1);
                async { Ok(7) }
            },
            Duration::from_millis(400),
            Some("fetch"),
        )
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_one_transient_error() {
        let calls = Cell::new(0u32);
        let result = retry_on_error(
            || {
                let attempt = calls.get() + 1;
                calls.set(attempt);
                async move {
                    if attempt == 1 {
                        Err(anyhow!("connection reset"))
                    } else {
                        Ok("state")
                    }
                }
            },
            Duration::from_millis(2500),
            Some("fetch"),
        )
        .await;
        assert_eq!(result, Ok("state"));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_into_timeout() {
        let calls = Cell::new(0u32);
        let start = Instant::now();
        let result: RunResult<()> = retry_on_error(
            || {
                calls.set(calls.get() + 1);
                async { Err(anyhow!("boom")) }
            },
            Duration::from_millis(3000),
            None,
        )
        .await;
        assert_eq!(result, Err(Failure::Timeout));
        // One attempt per backoff interval, none after the deadline.
        assert_eq!(calls.get(), 3);
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }
}
