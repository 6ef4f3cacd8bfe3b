//! Deterministic stand-ins for the external capabilities.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ai::{Summarizer, Synthesizer};
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::services::{FetchedPage, Fetcher, Notifier, SubmissionTracker};

pub const PREFIX: &str = "https://chatgpt.com/share/";

pub fn share_url(id: &str) -> String {
    format!("{}{}", PREFIX, id)
}

pub async fn tracker() -> Arc<SubmissionTracker> {
    let repo = Arc::new(Repository::open_in_memory().await.unwrap());
    Arc::new(SubmissionTracker::new(repo, PREFIX).unwrap())
}

/// Tracker over an on-disk store so a second connection can reach the same file.
pub async fn file_tracker(dir: &tempfile::TempDir) -> (Arc<SubmissionTracker>, PathBuf) {
    let path = dir.path().join("riff.db");
    let repo = Arc::new(Repository::new(path.to_str().unwrap()).await.unwrap());
    (Arc::new(SubmissionTracker::new(repo, PREFIX).unwrap()), path)
}

/// Drop the submissions table behind the repository's back; every later
/// statement on that store fails.
pub fn break_store(path: &Path) {
    rusqlite::Connection::open(path)
        .unwrap()
        .execute_batch("DROP TABLE submissions")
        .unwrap();
}

/// Serves canned pages; unknown urls fail.
#[derive(Default)]
pub struct FakeFetcher {
    pages: Mutex<HashMap<String, FetchedPage>>,
    pub calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn with_page(self, url: &str, content: &str) -> Self {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            FetchedPage {
                content: content.to_string(),
                summary: None,
            },
        );
        self
    }

    pub fn with_summarized_page(self, url: &str, content: &str, summary: &str) -> Self {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            FetchedPage {
                content: content.to_string(),
                summary: Some(summary.to_string()),
            },
        );
        self
    }

    pub fn add_page(&self, url: &str, content: &str) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            FetchedPage {
                content: content.to_string(),
                summary: None,
            },
        );
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::Fetch("HTTP 404 Not Found".to_string()))
    }
}

/// Digest is "digest of <content>".
pub struct EchoSummarizer;

#[async_trait]
impl Summarizer for EchoSummarizer {
    async fn summarize(&self, content: &str) -> Result<String> {
        Ok(format!("digest of {}", content))
    }
}

pub struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _content: &str) -> Result<String> {
        Err(AppError::Llm("model unavailable".to_string()))
    }
}

/// Records every body it is asked to synthesize and answers with a fixed reply.
#[derive(Default)]
pub struct RecordingSynthesizer {
    pub inputs: Mutex<Vec<String>>,
}

#[async_trait]
impl Synthesizer for RecordingSynthesizer {
    async fn synthesize(&self, raw_summaries: &str) -> Result<String> {
        self.inputs.lock().unwrap().push(raw_summaries.to_string());
        Ok(format!("synthesized: {}", raw_summaries))
    }
}

pub struct FailingSynthesizer;

#[async_trait]
impl Synthesizer for FailingSynthesizer {
    async fn synthesize(&self, _raw_summaries: &str) -> Result<String> {
        Err(AppError::Llm("API error 500".to_string()))
    }
}

/// Keeps delivered messages; can be switched into failing mode.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
    failing: std::sync::atomic::AtomicBool,
}

impl RecordingNotifier {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, message: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Delivery("Poke API error 503".to_string()));
        }
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}
