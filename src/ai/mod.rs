mod openrouter;
pub mod prompts;
mod summarizer;
mod synthesizer;

pub use openrouter::ChatClient;
pub use summarizer::{LlmSummarizer, Summarizer, TruncatingSummarizer};
pub use synthesizer::{LlmSynthesizer, Synthesizer};
