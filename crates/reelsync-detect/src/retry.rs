use std::time::Duration;

use tokio::sync::mpsc;

/// Re-delivers an item into a channel once, after a fixed delay.
///
/// The scheduled delivery has no cancellation handle; if the receiver is gone
/// by then the item is dropped.
#[derive(Debug, Clone)]
pub struct DeferredRetry<T> {
    delay: Duration,
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> DeferredRetry<T> {
    pub fn new(delay: Duration, tx: mpsc::UnboundedSender<T>) -> Self {
        Self { delay, tx }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&self, item: T) {
        let tx = self.tx.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(item).is_err() {
                tracing::debug!("Retry receiver closed, dropping deferred item");
            }
        });
    }
}
