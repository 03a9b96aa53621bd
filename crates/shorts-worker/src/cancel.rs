//! Run cancellation signal.

use tokio::sync::watch;

/// Cancellation flag shared by one pipeline run.
///
/// Wraps a `watch::Receiver<bool>`; `true` means cancelled. A signal without
/// a receiver never fires.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }

    /// Create a sender and its signal.
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self::new(rx))
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolve once cancellation is requested; pend forever otherwise.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender dropped without cancelling
                return std::future::pending().await;
            }
        }
    }

    /// Receiver for components that take the raw channel (FFmpeg runner).
    pub fn receiver(&self) -> Option<watch::Receiver<bool>> {
        self.rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancelled_resolves_after_send() {
        let (tx, signal) = CancelSignal::channel();
        assert!(!signal.is_cancelled());

        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.cancelled().await }
        });
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_none_never_fires() {
        let signal = CancelSignal::none();
        assert!(!signal.is_cancelled());
        let fired = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(fired.is_err());
    }
}
