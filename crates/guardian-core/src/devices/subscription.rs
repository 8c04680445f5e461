use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A long-lived, unbounded stream of device events.
///
/// Backed by a producer task; `cancel()` (or dropping the subscription)
/// aborts the producer. After cancellation `next()` drains whatever was
/// already buffered and then yields `None`.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
    producer: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Subscription<T> {
    /// Spawn `produce` on the current tokio runtime, feeding the subscription.
    pub fn spawn<F, Fut>(produce: F) -> Self
    where
        F: FnOnce(mpsc::UnboundedSender<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let producer = tokio::spawn(produce(tx));
        Self {
            rx,
            producer: Some(producer),
        }
    }
}

impl<T> Subscription<T> {
    /// Wrap a receiver whose sender is driven elsewhere.
    pub fn from_receiver(rx: mpsc::UnboundedReceiver<T>) -> Self {
        Self {
            rx,
            producer: None,
        }
    }

    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn cancel(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        self.rx.close();
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}
