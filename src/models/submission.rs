use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of content recorded when a fetch failed.
pub const ERROR_PREFIX: &str = "[Error]";
/// Prefix of content stored before a real scrape replaced it.
pub const PLACEHOLDER_PREFIX: &str = "[Placeholder]";

/// Whether stored content is a failure or stand-in marker rather than a transcript.
pub fn is_placeholder(content: &str) -> bool {
    content.starts_with(ERROR_PREFIX) || content.starts_with(PLACEHOLDER_PREFIX)
}

/// One tracked share link and everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub source_url: String,
    pub submitter: String,
    pub status: SubmissionStatus,
    pub content: Option<String>,
    pub digest: Option<String>,
    pub created_at: DateTime<Utc>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub shared_to_group_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn is_shared(&self) -> bool {
        self.shared_to_group_at.is_some()
    }

    /// Digest text usable as synthesis input, if any.
    pub fn usable_digest(&self) -> Option<&str> {
        if self.status != SubmissionStatus::Scraped {
            return None;
        }
        self.digest
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub source_url: String,
    pub submitter: String,
}

/// Scrape lifecycle of a submission. Sharing is tracked separately through
/// `Submission::shared_to_group_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Scraped,
    Error,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Scraped => "scraped",
            SubmissionStatus::Error => "error",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "scraped" => Ok(SubmissionStatus::Scraped),
            "error" => Ok(SubmissionStatus::Error),
            other => Err(format!("unknown submission status '{}'", other)),
        }
    }
}

/// Result of an insert-if-absent on the source url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(String),
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    Queued,
    AlreadyExists,
    QueuedButNotificationFailed,
}

/// What the intake surface reports back to a submitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub status: SubmitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    pub submitter: String,
    pub message: String,
}
