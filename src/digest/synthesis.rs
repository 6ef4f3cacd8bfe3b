use std::sync::Arc;

use crate::ai::prompts::{fallback_digest, group_digest, NO_CONVERSATIONS_MESSAGE};
use crate::ai::Synthesizer;
use crate::models::Submission;

/// Upper bound on digests any one submitter contributes to a message.
pub const MAX_DIGESTS_PER_SUBMITTER: usize = 2;

/// Builds the single cross-submitter message for a dispatch. Always yields
/// text: a missing or failing synthesizer degrades to a templated fallback.
pub struct SynthesisEngine {
    synthesizer: Option<Arc<dyn Synthesizer>>,
}

impl SynthesisEngine {
    pub fn new(synthesizer: Option<Arc<dyn Synthesizer>>) -> Self {
        Self { synthesizer }
    }

    /// Render usable digests as `From {submitter} (#{n}): {digest}` lines,
    /// grouped by submitter in encounter order and capped per submitter.
    /// `None` when no record has a usable digest.
    pub fn render_contributions(records: &[Submission]) -> Option<String> {
        let mut by_submitter: Vec<(&str, Vec<&str>)> = Vec::new();
        for record in records {
            let Some(digest) = record.usable_digest() else {
                continue;
            };
            let submitter = record.submitter.as_str();
            match by_submitter.iter_mut().find(|(name, _)| *name == submitter) {
                Some((_, digests)) => digests.push(digest),
                None => by_submitter.push((submitter, vec![digest])),
            }
        }

        let lines: Vec<String> = by_submitter
            .iter()
            .flat_map(|(submitter, digests)| {
                digests
                    .iter()
                    .take(MAX_DIGESTS_PER_SUBMITTER)
                    .enumerate()
                    .map(move |(i, digest)| format!("From {} (#{}): {}", submitter, i + 1, digest))
            })
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n\n"))
        }
    }

    pub async fn synthesize(&self, records: &[Submission]) -> String {
        let Some(body) = Self::render_contributions(records) else {
            tracing::info!(records = records.len(), "No digests to synthesize");
            return NO_CONVERSATIONS_MESSAGE.to_string();
        };

        let content = match &self.synthesizer {
            Some(synthesizer) => match synthesizer.synthesize(&body).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(error = %e, "Synthesis failed, using fallback digest");
                    fallback_digest(&body)
                }
            },
            None => {
                tracing::warn!("No synthesis model configured, using fallback digest");
                fallback_digest(&body)
            }
        };

        group_digest(&content)
    }
}
