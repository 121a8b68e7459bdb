//! Teardown signal for a mounted view.

use std::sync::Arc;
use tokio::sync::watch;

/// Level-triggered "this view is gone" flag.
///
/// Cloned handles share one flag. Once triggered it stays triggered, so a
/// waiter that subscribes late still observes it.
#[derive(Clone, Debug)]
pub struct TeardownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl TeardownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|down| *down).await;
    }
}

impl Default for TeardownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_before_wait_is_observed() {
        let signal = TeardownSignal::new();
        signal.clone().trigger();
        assert!(signal.is_triggered());
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_trigger_wakes_waiter() {
        let signal = TeardownSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        signal.trigger();
        waiter.await.unwrap();
    }

    #[test]
    fn test_cancelled_pending_until_trigger() {
        let signal = TeardownSignal::new();
        let mut cancelled = tokio_test::task::spawn(signal.cancelled());
        tokio_test::assert_pending!(cancelled.poll());

        signal.trigger();
        assert!(cancelled.is_woken());
        tokio_test::assert_ready!(cancelled.poll());
    }
}
