//! Ordered primary/secondary generation with single fallback.
//!
//! The primary is always tried first. If it errors, times out, or returns
//! blank text, the secondary is called exactly once. Whichever provider
//! succeeds serves the whole result; outputs are never blended.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{GenerationError, ProviderError};
use crate::providers::pricing::estimate_cost;
use crate::traits::provider::GenerationProvider;
use crate::types::generation::{GenerationResult, PromptPayload, ProviderResponse};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Primary + optional secondary provider.
#[derive(Clone)]
pub struct FallbackGenerator {
    primary: Arc<dyn GenerationProvider>,
    secondary: Option<Arc<dyn GenerationProvider>>,
    timeout: Duration,
}

impl FallbackGenerator {
    pub fn new(primary: Arc<dyn GenerationProvider>) -> Self {
        Self {
            primary,
            secondary: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Register the secondary provider.
    pub fn with_secondary(mut self, secondary: Arc<dyn GenerationProvider>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Timeout applied to each provider call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    /// Generate with fallback.
    pub async fn generate(
        &self,
        prompt: &PromptPayload,
    ) -> Result<GenerationResult, GenerationError> {
        let primary_error = match self.call(self.primary.as_ref(), prompt).await {
            Ok(response) => return Ok(self.result(self.primary.as_ref(), response, false)),
            Err(e) => e,
        };

        let Some(secondary) = &self.secondary else {
            warn!(
                provider = self.primary.name(),
                error = %primary_error,
                "Primary provider failed and no secondary is configured"
            );
            return Err(GenerationError::ProviderFailed {
                provider: self.primary.name().to_string(),
                source: primary_error,
            });
        };

        warn!(
            primary = self.primary.name(),
            secondary = secondary.name(),
            temporary = primary_error.is_temporary(),
            error = %primary_error,
            "Primary provider failed, falling back to secondary"
        );

        match self.call(secondary.as_ref(), prompt).await {
            Ok(response) => Ok(self.result(secondary.as_ref(), response, true)),
            Err(secondary_error) => Err(GenerationError::AllProvidersFailed {
                primary: self.primary.name().to_string(),
                primary_error,
                secondary: secondary.name().to_string(),
                secondary_error,
            }),
        }
    }

    /// One provider call under the timeout; blank text counts as failure.
    async fn call(
        &self,
        provider: &dyn GenerationProvider,
        prompt: &PromptPayload,
    ) -> Result<ProviderResponse, ProviderError> {
        let start = Instant::now();
        let response = tokio::time::timeout(self.timeout, provider.generate(prompt))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout.as_secs()))??;

        debug!(
            provider = provider.name(),
            model = provider.model(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Provider call finished"
        );

        if response.text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(response)
    }

    fn result(
        &self,
        provider: &dyn GenerationProvider,
        response: ProviderResponse,
        used_fallback: bool,
    ) -> GenerationResult {
        GenerationResult {
            estimated_cost_usd: estimate_cost(provider.name(), provider.model(), &response.usage),
            text: response.text,
            usage: response.usage,
            provider: provider.name().to_string(),
            model: provider.model().to_string(),
            used_fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;

    fn prompt() -> PromptPayload {
        PromptPayload::new("sys", "user")
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let primary = Arc::new(MockProvider::new("openai").with_response("{\"title\":\"A\"}"));
        let secondary = Arc::new(MockProvider::new("anthropic").with_response("{}"));

        let generator = FallbackGenerator::new(primary.clone()).with_secondary(secondary.clone());
        let result = generator.generate(&prompt()).await.unwrap();

        assert_eq!(result.provider, "openai");
        assert!(!result.used_fallback);
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_on_error() {
        let primary = Arc::new(
            MockProvider::new("openai").with_error(ProviderError::from_status(503, "overloaded")),
        );
        let secondary = Arc::new(MockProvider::new("anthropic").with_response("{\"title\":\"B\"}"));

        let generator = FallbackGenerator::new(primary.clone()).with_secondary(secondary.clone());
        let result = generator.generate(&prompt()).await.unwrap();

        assert_eq!(result.provider, "anthropic");
        assert_eq!(result.text, "{\"title\":\"B\"}");
        assert!(result.used_fallback);
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_on_blank_output() {
        let primary = Arc::new(MockProvider::new("openai").with_response("   \n"));
        let secondary = Arc::new(MockProvider::new("anthropic").with_response("{\"title\":\"C\"}"));

        let generator = FallbackGenerator::new(primary).with_secondary(secondary.clone());
        let result = generator.generate(&prompt()).await.unwrap();

        assert_eq!(result.provider, "anthropic");
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_on_timeout() {
        let primary = Arc::new(
            MockProvider::new("openai")
                .with_response("{}")
                .with_delay(Duration::from_millis(200)),
        );
        let secondary = Arc::new(MockProvider::new("anthropic").with_response("{\"title\":\"D\"}"));

        let generator = FallbackGenerator::new(primary)
            .with_secondary(secondary)
            .with_timeout(Duration::from_millis(20));
        let result = generator.generate(&prompt()).await.unwrap();

        assert_eq!(result.provider, "anthropic");
    }

    #[tokio::test]
    async fn test_both_fail() {
        let primary =
            Arc::new(MockProvider::new("openai").with_error(ProviderError::EmptyResponse));
        let secondary = Arc::new(
            MockProvider::new("anthropic").with_error(ProviderError::RateLimited {
                retry_after_secs: Some(3),
            }),
        );

        let generator = FallbackGenerator::new(primary).with_secondary(secondary.clone());
        let err = generator.generate(&prompt()).await.unwrap_err();

        match err {
            GenerationError::AllProvidersFailed {
                primary,
                secondary,
                secondary_error,
                ..
            } => {
                assert_eq!(primary, "openai");
                assert_eq!(secondary, "anthropic");
                assert!(secondary_error.is_temporary());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Secondary is called exactly once, never retried
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_secondary() {
        let primary =
            Arc::new(MockProvider::new("openai").with_error(ProviderError::EmptyResponse));
        let generator = FallbackGenerator::new(primary);

        assert!(matches!(
            generator.generate(&prompt()).await,
            Err(GenerationError::ProviderFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_cost_attached() {
        let primary = Arc::new(
            MockProvider::new("openai")
                .with_model("gpt-4o")
                .with_response("{\"title\":\"A\"}")
                .with_usage(1000, 1000),
        );
        let result = FallbackGenerator::new(primary)
            .generate(&prompt())
            .await
            .unwrap();

        assert!((result.estimated_cost_usd - 0.0125).abs() < 1e-9);
        assert_eq!(result.model, "gpt-4o");
    }
}
