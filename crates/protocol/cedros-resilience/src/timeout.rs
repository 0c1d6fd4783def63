//! Deadline and caller cancellation for a single outbound call.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use cedros_types::constants::DEFAULT_REQUEST_TIMEOUT_MS;

use crate::error::ResilienceError;

/// Deadline plus optional cancellation token for one call.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Maximum time the call may take
    pub timeout: Duration,
    /// Caller-owned cancellation
    pub cancel: Option<CancellationToken>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            cancel: None,
        }
    }
}

impl CallContext {
    /// Context with the given timeout and no cancellation.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: None,
        }
    }

    /// Attach a cancellation token.
    pub fn cancellable(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Whether the caller has already cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Run `fut` under this context.
    ///
    /// A token cancelled before the call aborts without polling `fut`.
    pub async fn run<F, T, E>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<ResilienceError>,
    {
        if self.is_cancelled() {
            return Err(ResilienceError::Cancelled.into());
        }

        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => {
                debug!("Call cancelled by caller");
                Err(ResilienceError::Cancelled.into())
            }
            result = fut => result,
            _ = tokio::time::sleep(self.timeout) => {
                debug!(timeout_ms = self.timeout.as_millis() as u64, "Call timed out");
                Err(ResilienceError::TimedOut { after: self.timeout }.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_completes_before_deadline() {
        let ctx = CallContext::with_timeout(Duration::from_secs(1));
        let result: Result<u32, ResilienceError> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(5)
            })
            .await;
        assert_eq!(result, Ok(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let ctx = CallContext::with_timeout(Duration::from_millis(100));
        let result: Result<u32, ResilienceError> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(5)
            })
            .await;
        assert_eq!(
            result,
            Err(ResilienceError::TimedOut {
                after: Duration::from_millis(100)
            })
        );
        assert_eq!(result.unwrap_err().to_string(), "timed out after 100ms");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_cancelled_token_skips_call() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CallContext::default().cancellable(token);

        let polled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&polled);
        let result: Result<(), ResilienceError> = ctx
            .run(async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(result, Err(ResilienceError::Cancelled));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_call() {
        let token = CancellationToken::new();
        let ctx = CallContext::default().cancellable(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let result: Result<(), ResilienceError> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        canceller.await.unwrap();
        assert_eq!(result, Err(ResilienceError::Cancelled));
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(CallContext::default().timeout, Duration::from_secs(15));
    }
}
