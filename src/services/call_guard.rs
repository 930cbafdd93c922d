//! Bounded concurrency and deadlines for downstream model calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::domain::errors::{DomainError, DomainResult};

/// Limits in-flight calls to a shared backend and applies a per-call deadline.
///
/// Clones share the same permit pool.
#[derive(Debug, Clone)]
pub struct CallGuard {
    permits: Arc<Semaphore>,
    deadline: Duration,
}

impl CallGuard {
    pub fn new(max_concurrency: usize, deadline: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            deadline,
        }
    }

    pub fn from_secs(max_concurrency: usize, secs: u64) -> Self {
        Self::new(max_concurrency, Duration::from_secs(secs))
    }

    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `call` once a permit is free. The deadline covers the call only,
    /// not the wait for a permit.
    pub async fn run<T, F>(&self, call: F) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| DomainError::Unavailable("call guard closed".to_string()))?;

        match timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                let after_ms = u64::try_from(self.deadline.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(after_ms, "downstream call timed out");
                Err(DomainError::Timeout(after_ms))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_passes_through_result() {
        let guard = CallGuard::new(2, Duration::from_secs(1));
        let value = guard.run(async { Ok::<_, DomainError>(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_times_out() {
        let guard = CallGuard::new(1, Duration::from_millis(20));
        let err = guard
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, DomainError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Timeout(20)));
    }

    #[tokio::test]
    async fn test_bounds_concurrency() {
        let guard = CallGuard::new(2, Duration::from_secs(5));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let calls = (0..8).map(|_| {
            let guard = guard.clone();
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                guard
                    .run(async {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, DomainError>(())
                    })
                    .await
            }
        });
        futures::future::join_all(calls).await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
