use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTask {
    pub url: String,
}

/// Sending half of the unbounded FIFO of urls waiting to be scraped.
#[derive(Clone)]
pub struct ScrapeQueue {
    tx: mpsc::UnboundedSender<ScrapeTask>,
    depth: Arc<AtomicUsize>,
}

/// Receiving half, handed to the worker pool.
pub struct ScrapeReceiver {
    rx: mpsc::UnboundedReceiver<ScrapeTask>,
    depth: Arc<AtomicUsize>,
}

impl ScrapeQueue {
    pub fn new() -> (Self, ScrapeReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        (
            Self {
                tx,
                depth: Arc::clone(&depth),
            },
            ScrapeReceiver { rx, depth },
        )
    }

    pub fn enqueue(&self, url: impl Into<String>) -> Result<()> {
        let task = ScrapeTask { url: url.into() };
        // Count first so a fast worker never sees the depth underflow.
        self.depth.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(task).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::QueueClosed);
        }
        Ok(())
    }

    /// Tasks enqueued but not yet picked up by a worker.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl ScrapeReceiver {
    pub async fn recv(&mut self) -> Option<ScrapeTask> {
        let task = self.rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(task)
    }
}
