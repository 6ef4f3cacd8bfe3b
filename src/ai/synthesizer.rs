use async_trait::async_trait;

use crate::error::Result;

use super::openrouter::ChatClient;
use super::prompts::{synthesis_input, GROUP_SYNTHESIS_SYSTEM_PROMPT};

/// Turns the rendered per-submitter digests into one group message.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, raw_summaries: &str) -> Result<String>;
}

pub struct LlmSynthesizer {
    client: ChatClient,
}

impl LlmSynthesizer {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Synthesizer for LlmSynthesizer {
    async fn synthesize(&self, raw_summaries: &str) -> Result<String> {
        tracing::debug!(model = %self.client.model(), "Synthesizing group digest");
        let content = self
            .client
            .complete(GROUP_SYNTHESIS_SYSTEM_PROMPT, synthesis_input(raw_summaries))
            .await?;
        tracing::info!(model = %self.client.model(), chars = content.len(), "Synthesis succeeded");
        Ok(content)
    }
}
