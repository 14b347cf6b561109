//! Prompt and generation types shared by all providers.

use serde::{Deserialize, Serialize};

/// A provider-agnostic generation request.
///
/// Providers reshape this into their own calling convention; the content is
/// identical whichever provider serves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPayload {
    pub system: String,
    pub user: String,
    pub json_mode: bool,
    pub temperature: f32,
    /// Optional image attachment (URL)
    #[serde(default)]
    pub image_url: Option<String>,
}

impl PromptPayload {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            json_mode: true,
            temperature: 0.2,
            image_url: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// Token usage normalized across providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Raw response from a single provider call.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,
    pub usage: TokenUsage,
}

impl ProviderResponse {
    pub fn new(text: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }
}

/// Output of the fallback orchestrator: exactly one provider's result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub text: String,
    pub usage: TokenUsage,
    /// Provider that served this result
    pub provider: String,
    pub model: String,
    pub estimated_cost_usd: f64,
    /// True when the secondary provider served the request
    pub used_fallback: bool,
}
