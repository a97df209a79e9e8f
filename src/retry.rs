use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Bounded exponential backoff for a fallible async operation.
///
/// No jitter: the delay for a given attempt index is deterministic, which
/// keeps retry timing reproducible in tests and logs.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10000),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based):
    /// `min(base * multiplier^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = (self.multiplier as u64).saturating_pow(attempt);
        let ms = (self.base_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(ms).min(self.max_delay)
    }
}

/// Run `op`, retrying on failure up to `policy.max_retries` times with
/// exponential backoff. The final error is returned unchanged; retried
/// operations are assumed idempotent by the caller.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt >= policy.max_retries {
                    return Err(e);
                }
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "call failed, retrying in {}ms (attempt {}/{}): {e:#}",
                    delay.as_millis(),
                    attempt + 1,
                    policy.max_retries
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::RefCell;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10000),
            multiplier: 2,
        }
    }

    #[test]
    fn delay_sequence_is_capped() {
        let p = policy();
        assert_eq!(p.delay_for(0), Duration::from_millis(1000));
        assert_eq!(p.delay_for(1), Duration::from_millis(2000));
        assert_eq!(p.delay_for(2), Duration::from_millis(4000));
        assert_eq!(p.delay_for(5), Duration::from_millis(10000)); // capped
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_failures() {
        let calls = RefCell::new(0u32);
        let starts = RefCell::new(Vec::new());
        let res = retry_with_backoff(&policy(), || {
            starts.borrow_mut().push(tokio::time::Instant::now());
            let n = {
                let mut c = calls.borrow_mut();
                *c += 1;
                *c
            };
            async move {
                if n <= 2 {
                    Err(anyhow!("boom {n}"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(res.unwrap(), 3);
        assert_eq!(*calls.borrow(), 3);

        // Observed inter-attempt delays: base, then base * multiplier.
        let starts = starts.borrow();
        assert_eq!(starts[1] - starts[0], Duration::from_millis(1000));
        assert_eq!(starts[2] - starts[1], Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn propagates_final_error_unchanged() {
        let calls = RefCell::new(0u32);
        let res: Result<()> = retry_with_backoff(&policy(), || {
            *calls.borrow_mut() += 1;
            async { Err(anyhow!("always down")) }
        })
        .await;

        // max_retries = 3 means 4 invocations total.
        assert_eq!(*calls.borrow(), 4);
        assert_eq!(res.unwrap_err().to_string(), "always down");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_fails_immediately() {
        let p = RetryPolicy {
            max_retries: 0,
            ..policy()
        };
        let calls = RefCell::new(0u32);
        let res: Result<()> = retry_with_backoff(&p, || {
            *calls.borrow_mut() += 1;
            async { Err(anyhow!("down")) }
        })
        .await;
        assert_eq!(*calls.borrow(), 1);
        assert!(res.is_err());
    }
}
