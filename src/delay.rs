//! Timed waits used between retries and polls
//!
//! Both the submission retrier and the confirmation poller suspend through a
//! [`Delay`] instead of calling the runtime timer directly, so tests can record
//! the requested waits without real elapsed time. Dropping a pending `sleep`
//! future cancels the wait.

use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Delay backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Returns immediately and remembers every requested wait
    #[derive(Default)]
    pub struct RecordingDelay {
        waits: Mutex<Vec<Duration>>,
    }

    impl RecordingDelay {
        pub fn waits_ms(&self) -> Vec<u64> {
            self.waits
                .lock()
                .unwrap()
                .iter()
                .map(|d| d.as_millis() as u64)
                .collect()
        }
    }

    #[async_trait]
    impl Delay for RecordingDelay {
        async fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_delay_advances_virtual_time() {
        let start = tokio::time::Instant::now();
        TokioDelay.sleep(Duration::from_millis(3000)).await;
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sleep_is_cancelled() {
        let result = tokio::time::timeout(
            Duration::from_millis(10),
            TokioDelay.sleep(Duration::from_secs(60)),
        )
        .await;
        assert!(result.is_err());
    }
}
