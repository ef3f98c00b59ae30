//! Per-invocation cancellation for long remote calls.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{Error, Result};

/// Cloneable handle; cancelling any clone cancels them all.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`Self::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives as long as `self`, so this only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Runs `fut` unless cancelled first; cancellation drops the future.
    pub async fn guard<T>(&self, fut: impl Future<Output = T>) -> Result<T> {
        tokio::select! {
            biased;
            () = self.cancelled() => Err(Error::Cancelled),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_guard_passes_through() {
        let token = CancelToken::new();
        assert_eq!(token.guard(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_future() {
        let token = CancelToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let out = token
            .guard(tokio::time::sleep(Duration::from_secs(60)))
            .await;
        assert!(matches!(out, Err(Error::Cancelled)));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(token.guard(async { 1 }).await, Err(Error::Cancelled)));
    }
}
