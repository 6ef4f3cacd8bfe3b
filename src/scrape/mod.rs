mod queue;
mod sweep;
mod worker;

pub use queue::{ScrapeQueue, ScrapeReceiver};
pub use sweep::{enqueue_unscraped, scrape_unscraped_now, SweepReport};
pub use worker::{ScrapeOutcome, ScrapeWorker, WorkerPool};
