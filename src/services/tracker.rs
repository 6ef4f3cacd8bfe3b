use std::sync::Arc;

use crate::db::Repository;
use crate::error::Result;
use crate::models::{InsertOutcome, NewSubmission};

use super::ShareLinkValidator;

const ANONYMOUS: &str = "Anonymous";

/// Display name recorded for a submitter; blank names become "Anonymous".
pub fn submitter_name(submitter: &str) -> &str {
    match submitter.trim() {
        "" => ANONYMOUS,
        name => name,
    }
}

/// Owns the per-submission lifecycle: validated intake, scrape results and
/// share markers. All state lives in the repository.
pub struct SubmissionTracker {
    repository: Arc<Repository>,
    links: ShareLinkValidator,
}

impl SubmissionTracker {
    pub fn new(repository: Arc<Repository>, share_url_prefix: &str) -> Result<Self> {
        Ok(Self {
            repository,
            links: ShareLinkValidator::new(share_url_prefix)?,
        })
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    /// The trimmed url when it has the share-link shape.
    pub fn validate_link<'a>(&self, url: &'a str) -> Result<&'a str> {
        self.links.validate(url)
    }

    /// Validate and insert a new pending submission. Resubmitting a known url
    /// returns `AlreadyExists` and keeps the first submitter.
    pub async fn submit(&self, url: &str, submitter: &str) -> Result<(String, InsertOutcome)> {
        let url = self.links.validate(url)?.to_string();
        let submitter = submitter_name(submitter).to_string();

        let outcome = self
            .repository
            .insert_submission(NewSubmission {
                source_url: url.clone(),
                submitter: submitter.clone(),
            })
            .await?;

        match &outcome {
            InsertOutcome::Inserted(id) => {
                tracing::info!(url = %url, submitter = %submitter, id = %id, "Submission recorded")
            }
            InsertOutcome::AlreadyExists => {
                tracing::info!(url = %url, submitter = %submitter, "Submission already tracked")
            }
        }

        Ok((url, outcome))
    }

    pub async fn record_scrape_result(&self, url: &str, content: String, digest: String) -> Result<()> {
        let updated = self
            .repository
            .record_scrape_result(url, content, digest)
            .await?;
        if updated == 0 {
            tracing::warn!(url = %url, "Scrape finished for an untracked url");
        }
        Ok(())
    }

    pub async fn record_scrape_failure(&self, url: &str, placeholder: String) -> Result<()> {
        self.repository
            .record_scrape_failure(url, placeholder)
            .await?;
        Ok(())
    }

    /// Mark urls shared. Returns how many were unshared before the call.
    pub async fn mark_shared(&self, urls: &[String]) -> Result<usize> {
        if urls.is_empty() {
            return Ok(0);
        }
        let marked = self.repository.mark_shared(urls).await?;
        tracing::info!(requested = urls.len(), marked, "Marked submissions as shared");
        Ok(marked)
    }

    /// Administrative: clear every share marker so the next dispatch re-shares.
    pub async fn reset_all_shared(&self) -> Result<usize> {
        let reset = self.repository.reset_all_shared().await?;
        tracing::warn!(reset, "Reset all share markers");
        Ok(reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    async fn tracker() -> SubmissionTracker {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        SubmissionTracker::new(repo, "https://chatgpt.com/share/").unwrap()
    }

    #[tokio::test]
    async fn invalid_links_are_never_stored() {
        let tracker = tracker().await;

        let err = tracker
            .submit("https://example.com/share/abc", "xyn")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(tracker.repository().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn second_submitter_is_absorbed() {
        let tracker = tracker().await;

        let (_, first) = tracker
            .submit("https://chatgpt.com/share/abc", "xyn")
            .await
            .unwrap();
        let (_, second) = tracker
            .submit(" https://chatgpt.com/share/abc ", "seven")
            .await
            .unwrap();

        assert!(matches!(first, InsertOutcome::Inserted(_)));
        assert_eq!(second, InsertOutcome::AlreadyExists);
        let stored = tracker
            .repository()
            .submission_by_url("https://chatgpt.com/share/abc")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.submitter, "xyn");
    }

    #[tokio::test]
    async fn blank_submitter_becomes_anonymous() {
        let tracker = tracker().await;
        tracker
            .submit("https://chatgpt.com/share/abc", "  ")
            .await
            .unwrap();
        assert_eq!(
            tracker.repository().distinct_submitters().await.unwrap(),
            vec![ANONYMOUS.to_string()]
        );
    }

    #[tokio::test]
    async fn marking_nothing_is_a_no_op() {
        let tracker = tracker().await;
        assert_eq!(tracker.mark_shared(&[]).await.unwrap(), 0);
    }
}
