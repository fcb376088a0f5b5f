//! Streamed fetch results.

use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Result, SessionError};
use crate::domain::RawMessage;

/// Messages delivered by an in-flight fetch, plus its completion signal.
///
/// Consumers read items with [`next`](Self::next) until it yields `None`, then
/// call [`finish`](Self::finish) to learn whether the fetch as a whole
/// succeeded. Items delivered before a failure are still valid.
pub struct FetchStream {
    items: mpsc::Receiver<RawMessage>,
    completion: JoinHandle<Result<()>>,
    received: usize,
}

impl FetchStream {
    /// Runs `producer` on its own task, feeding a channel of `capacity` items.
    pub fn spawn<F, Fut>(capacity: usize, producer: F) -> Self
    where
        F: FnOnce(mpsc::Sender<RawMessage>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let completion = tokio::spawn(producer(tx));
        Self {
            items: rx,
            completion,
            received: 0,
        }
    }

    /// Next delivered message, or `None` once the producer is done.
    pub async fn next(&mut self) -> Option<RawMessage> {
        let message = self.items.recv().await?;
        self.received += 1;
        Some(message)
    }

    /// Number of messages handed out so far.
    pub fn received(&self) -> usize {
        self.received
    }

    /// Drains anything left in the channel and waits for the producer.
    pub async fn finish(mut self) -> Result<()> {
        let mut discarded = 0usize;
        while self.items.recv().await.is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            tracing::warn!(discarded, "Fetch stream finished with unread messages");
        }

        self.completion
            .await
            .map_err(|e| SessionError::Fetch(format!("fetch task failed: {}", e)))?
    }
}
