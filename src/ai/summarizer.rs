use async_trait::async_trait;

use crate::error::Result;

use super::openrouter::ChatClient;
use super::prompts::{digest_input, DIGEST_SYSTEM_PROMPT};

const MAX_INPUT_CHARS: usize = 3000;
const TRUNCATED_DIGEST_CHARS: usize = 500;

/// Produces a short digest from a conversation transcript.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, content: &str) -> Result<String>;
}

/// First `max_chars` characters of `content`, with an ellipsis when cut.
pub fn truncate_digest(content: &str, max_chars: usize) -> String {
    let mut chars = content.char_indices();
    match chars.nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

/// Used when no model key is configured.
pub struct TruncatingSummarizer;

#[async_trait]
impl Summarizer for TruncatingSummarizer {
    async fn summarize(&self, content: &str) -> Result<String> {
        Ok(truncate_digest(content, TRUNCATED_DIGEST_CHARS))
    }
}

/// Model-backed digests. Falls back to truncation when the call fails.
pub struct LlmSummarizer {
    client: ChatClient,
}

impl LlmSummarizer {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, content: &str) -> Result<String> {
        let input = match content.char_indices().nth(MAX_INPUT_CHARS) {
            Some((idx, _)) => &content[..idx],
            None => content,
        };

        match self.client.complete(DIGEST_SYSTEM_PROMPT, digest_input(input)).await {
            Ok(digest) => Ok(digest),
            Err(e) => {
                tracing::warn!(model = %self.client.model(), error = %e, "Digest generation failed, truncating instead");
                Ok(truncate_digest(content, TRUNCATED_DIGEST_CHARS))
            }
        }
    }
}
