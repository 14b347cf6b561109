//! Generation provider trait.
//!
//! Each provider reshapes the shared [`PromptPayload`] into its own calling
//! convention and reports token usage in the common [`TokenUsage`] shape.
//!
//! [`TokenUsage`]: crate::types::generation::TokenUsage

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::generation::{PromptPayload, ProviderResponse};

/// A text-completion provider.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Run one completion.
    ///
    /// Returns the raw output text; an empty string is a valid response here
    /// and is treated as a failure by the fallback orchestrator.
    async fn generate(&self, prompt: &PromptPayload) -> Result<ProviderResponse, ProviderError>;

    /// Provider tag ("openai", "anthropic").
    fn name(&self) -> &str;

    /// Model identifier used for requests.
    fn model(&self) -> &str;
}
