use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::ai::Summarizer;
use crate::error::Result;
use crate::services::{failure_placeholder, Fetcher, SubmissionTracker};

use super::ScrapeReceiver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    Scraped,
    /// Capability failure; the record stays pending for a later sweep.
    Failed(String),
}

/// Fetch, digest and record one url.
pub struct ScrapeWorker {
    tracker: Arc<SubmissionTracker>,
    fetcher: Arc<dyn Fetcher>,
    summarizer: Arc<dyn Summarizer>,
}

impl ScrapeWorker {
    pub fn new(
        tracker: Arc<SubmissionTracker>,
        fetcher: Arc<dyn Fetcher>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            tracker,
            fetcher,
            summarizer,
        }
    }

    /// Capability failures come back as `ScrapeOutcome::Failed`; only store
    /// failures are returned as errors.
    pub async fn process(&self, url: &str) -> Result<ScrapeOutcome> {
        tracing::info!(url = %url, "Scraping");

        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Fetch failed, leaving submission pending");
                let placeholder = failure_placeholder(url, &e);
                self.tracker.record_scrape_failure(url, placeholder).await?;
                return Ok(ScrapeOutcome::Failed(e.to_string()));
            }
        };

        let digest = match page.summary {
            Some(summary) => summary,
            None => match self.summarizer.summarize(&page.content).await {
                Ok(digest) => digest,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Summarizer failed, leaving submission pending");
                    return Ok(ScrapeOutcome::Failed(e.to_string()));
                }
            },
        };

        self.tracker
            .record_scrape_result(url, page.content, digest)
            .await?;
        tracing::info!(url = %url, "Scraped and stored");
        Ok(ScrapeOutcome::Scraped)
    }
}

/// Handles for the running scrape workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `count` workers draining `receiver` until `shutdown` flips to true
    /// or every queue handle is dropped.
    pub fn spawn(
        count: usize,
        receiver: ScrapeReceiver,
        worker: Arc<ScrapeWorker>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let receiver = Arc::new(Mutex::new(receiver));
        let handles = (0..count.max(1))
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                let worker = Arc::clone(&worker);
                let shutdown = shutdown.clone();
                tokio::spawn(run_worker(id, receiver, worker, shutdown))
            })
            .collect();
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub async fn join(self) {
        for result in join_all(self.handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Scrape worker panicked");
            }
        }
    }
}

async fn run_worker(
    id: usize,
    receiver: Arc<Mutex<ScrapeReceiver>>,
    worker: Arc<ScrapeWorker>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!(worker = id, "Scrape worker started");
    loop {
        if *shutdown.borrow() {
            break;
        }

        let task = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                task = receiver.recv() => task,
                _ = shutdown.changed() => None,
            }
        };

        let Some(task) = task else {
            break;
        };

        // Failures are dropped here; the pending sweep is the only retry path.
        match worker.process(&task.url).await {
            Ok(_) => {}
            Err(e) if e.is_store_failure() => {
                tracing::error!(worker = id, url = %task.url, error = %e, "Store failure while scraping")
            }
            Err(e) => tracing::warn!(worker = id, url = %task.url, error = %e, "Scrape aborted"),
        }
    }
    tracing::debug!(worker = id, "Scrape worker stopped");
}
