use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::ai::{ChatClient, LlmSummarizer, LlmSynthesizer, Summarizer, Synthesizer, TruncatingSummarizer};
use crate::config::Config;
use crate::db::Repository;
use crate::digest::{CycleOutcome, DigestDispatcher, DispatchTrigger, SynthesisEngine};
use crate::error::{AppError, Result};
use crate::models::{InsertOutcome, Submission, SubmitReceipt, SubmitStatus};
use crate::scrape::{
    enqueue_unscraped, scrape_unscraped_now, ScrapeOutcome, ScrapeQueue, ScrapeReceiver,
    ScrapeWorker, SweepReport,
};
use crate::services::{
    submitter_name, ContentFetcher, Fetcher, LogNotifier, Notifier, PokeNotifier,
    SubmissionTracker,
};

/// The external collaborators, chosen from config or injected by tests.
pub struct Capabilities {
    pub fetcher: Arc<dyn Fetcher>,
    pub summarizer: Arc<dyn Summarizer>,
    pub synthesizer: Option<Arc<dyn Synthesizer>>,
    pub notifier: Arc<dyn Notifier>,
}

impl Capabilities {
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.request_timeout();

        let fetcher = Arc::new(ContentFetcher::new(config.firecrawl_api_key.clone(), timeout)?);

        let (summarizer, synthesizer): (Arc<dyn Summarizer>, Option<Arc<dyn Synthesizer>>) =
            match &config.openrouter_api_key {
                Some(key) => {
                    let client =
                        ChatClient::new(key.clone(), config.digest_model.clone(), timeout)?;
                    (
                        Arc::new(LlmSummarizer::new(client.clone())),
                        Some(Arc::new(LlmSynthesizer::new(client))),
                    )
                }
                None => {
                    tracing::warn!("No OpenRouter API key configured, digests will be truncated content");
                    (Arc::new(TruncatingSummarizer), None)
                }
            };

        let notifier: Arc<dyn Notifier> = match &config.poke_api_key {
            Some(key) => Arc::new(PokeNotifier::new(
                config.poke_api_url.clone(),
                key.clone(),
                config.poke_chat_id.clone(),
                timeout,
            )?),
            None => {
                tracing::warn!("No Poke API key configured, digests will only be logged");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self {
            fetcher,
            summarizer,
            synthesizer,
            notifier,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub queue_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullFlowReport {
    pub reset_count: usize,
    pub sweep: SweepReport,
    pub dispatch: CycleOutcome,
}

pub struct App {
    tracker: Arc<SubmissionTracker>,
    queue: ScrapeQueue,
    worker: Arc<ScrapeWorker>,
    dispatcher: Arc<DigestDispatcher>,
}

impl App {
    /// Open the store and build every component. The returned receiver feeds
    /// the worker pool; dropping it closes the queue.
    pub async fn new(config: &Config) -> Result<(Self, ScrapeReceiver)> {
        let repository = Arc::new(Repository::new(&config.db_path).await?);
        let capabilities = Capabilities::from_config(config)?;
        Self::with_capabilities(repository, &config.share_url_prefix, capabilities)
    }

    pub fn with_capabilities(
        repository: Arc<Repository>,
        share_url_prefix: &str,
        capabilities: Capabilities,
    ) -> Result<(Self, ScrapeReceiver)> {
        let tracker = Arc::new(SubmissionTracker::new(repository, share_url_prefix)?);
        let (queue, receiver) = ScrapeQueue::new();

        let worker = Arc::new(ScrapeWorker::new(
            tracker.clone(),
            capabilities.fetcher,
            capabilities.summarizer,
        ));
        let dispatcher = Arc::new(DigestDispatcher::new(
            tracker.clone(),
            SynthesisEngine::new(capabilities.synthesizer),
            capabilities.notifier,
        ));

        Ok((
            Self {
                tracker,
                queue,
                worker,
                dispatcher,
            },
            receiver,
        ))
    }

    pub fn worker(&self) -> Arc<ScrapeWorker> {
        Arc::clone(&self.worker)
    }

    pub fn dispatcher(&self) -> Arc<DigestDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    fn repository(&self) -> &Repository {
        self.tracker.repository()
    }

    // Intake

    /// Record a submission and queue it for scraping. The record is kept even
    /// when the queue is gone; the next sweep picks it up.
    pub async fn submit(&self, url: &str, submitter: &str) -> Result<SubmitReceipt> {
        let (url, outcome) = self.tracker.submit(url, submitter).await?;
        let submitter = submitter_name(submitter).to_string();

        let id = match outcome {
            InsertOutcome::AlreadyExists => {
                return Ok(SubmitReceipt {
                    status: SubmitStatus::AlreadyExists,
                    id: None,
                    url,
                    submitter,
                    message: "This link has already been submitted.".to_string(),
                });
            }
            InsertOutcome::Inserted(id) => id,
        };

        let (status, message) = match self.queue.enqueue(url.clone()) {
            Ok(()) => (
                SubmitStatus::Queued,
                "Link submitted! It will be scraped and included in the next digest.",
            ),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Could not queue new submission");
                (
                    SubmitStatus::QueuedButNotificationFailed,
                    "Link saved, but scraping could not be queued. The next sweep will pick it up.",
                )
            }
        };

        Ok(SubmitReceipt {
            status,
            id: Some(id),
            url,
            submitter,
            message: message.to_string(),
        })
    }

    /// Queue an already tracked url for another scrape attempt.
    pub async fn enqueue(&self, url: &str) -> Result<()> {
        let url = self.tracker.validate_link(url)?;
        if self.repository().submission_by_url(url).await?.is_none() {
            return Err(AppError::NotFound(format!("No submission for {}", url)));
        }
        self.queue.enqueue(url)?;
        tracing::info!(url = %url, "Queued url for scraping");
        Ok(())
    }

    /// Scrape one url right away, bypassing the queue.
    pub async fn scrape_now(&self, url: &str) -> Result<ScrapeOutcome> {
        self.worker.process(url).await
    }

    // Queries

    pub async fn submitters(&self) -> Result<Vec<String>> {
        self.repository().distinct_submitters().await
    }

    pub async fn history(&self, submitter: &str) -> Result<Vec<Submission>> {
        self.repository().submissions_by_submitter(submitter).await
    }

    pub async fn show(&self, url: &str) -> Result<Submission> {
        self.repository()
            .submission_by_url(url.trim())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No submission for {}", url.trim())))
    }

    /// Scraped records for `date`, today (UTC) when absent.
    pub async fn daily(&self, date: Option<NaiveDate>) -> Result<Vec<Submission>> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        self.repository().scraped_on(date).await
    }

    // Administration

    pub async fn mark_shared(&self, urls: &[String]) -> Result<usize> {
        self.tracker.mark_shared(urls).await
    }

    pub async fn reset_shared(&self) -> Result<usize> {
        self.tracker.reset_all_shared().await
    }

    // Dispatch and maintenance

    pub async fn trigger_digest(&self) -> Result<CycleOutcome> {
        self.dispatcher.run_cycle(DispatchTrigger::Manual).await
    }

    /// Queue every record that still lacks usable content.
    pub async fn sweep(&self) -> Result<usize> {
        enqueue_unscraped(self.repository(), &self.queue).await
    }

    /// Scrape every record that still lacks usable content, inline.
    pub async fn scrape_pending_now(&self) -> Result<SweepReport> {
        scrape_unscraped_now(self.repository(), &self.worker).await
    }

    /// Reset share markers, scrape everything pending, then dispatch.
    pub async fn full_flow(&self) -> Result<FullFlowReport> {
        tracing::info!("Running full flow");
        let reset_count = self.reset_shared().await?;
        let sweep = self.scrape_pending_now().await?;
        let dispatch = self.trigger_digest().await?;
        Ok(FullFlowReport {
            reset_count,
            sweep,
            dispatch,
        })
    }

    pub fn health(&self) -> Health {
        Health {
            status: if self.queue.is_closed() { "degraded" } else { "healthy" },
            queue_size: self.queue.len(),
        }
    }
}
