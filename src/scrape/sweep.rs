use serde::Serialize;

use crate::db::Repository;
use crate::error::Result;

use super::{ScrapeOutcome, ScrapeQueue, ScrapeWorker};

/// Re-enqueue every record that still lacks usable content.
/// This is the only retry path for failed scrapes.
pub async fn enqueue_unscraped(repository: &Repository, queue: &ScrapeQueue) -> Result<usize> {
    let unscraped = repository.unscraped().await?;
    for submission in &unscraped {
        queue.enqueue(submission.source_url.clone())?;
    }
    tracing::info!(count = unscraped.len(), "Queued unscraped submissions");
    Ok(unscraped.len())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub total: usize,
    pub scraped: usize,
    pub failed: usize,
}

/// Scrape every unscraped record inline, bypassing the queue.
pub async fn scrape_unscraped_now(
    repository: &Repository,
    worker: &ScrapeWorker,
) -> Result<SweepReport> {
    let unscraped = repository.unscraped().await?;
    let mut report = SweepReport {
        total: unscraped.len(),
        ..SweepReport::default()
    };

    for submission in unscraped {
        match worker.process(&submission.source_url).await? {
            ScrapeOutcome::Scraped => report.scraped += 1,
            ScrapeOutcome::Failed(_) => report.failed += 1,
        }
    }

    tracing::info!(
        total = report.total,
        scraped = report.scraped,
        failed = report.failed,
        "Inline scrape sweep finished"
    );
    Ok(report)
}
