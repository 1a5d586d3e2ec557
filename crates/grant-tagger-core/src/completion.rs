//! Text-completion provider trait.
//!
//! Concrete providers (Gemini, OpenAI) live in the `grant-tagger` app crate.
//! The core only needs prompt-in/text-out.

use anyhow::Result;
use async_trait::async_trait;

/// An external language model reached over some transport.
///
/// No latency or availability guarantees are assumed; callers bound the
/// call with their own timeout.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-1.5-flash"`).
    fn model_name(&self) -> &str;

    /// Send `prompt` and return the raw response text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
