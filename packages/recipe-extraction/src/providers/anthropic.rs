//! Anthropic messages-API provider.
//!
//! The system prompt goes in the top-level `system` field. There is no JSON
//! response mode, so JSON output is demanded in the system text instead.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::providers::openai::retry_after;
use crate::providers::credentials::{ProviderCredentials, SecretString};
use crate::traits::provider::GenerationProvider;
use crate::types::generation::{PromptPayload, ProviderResponse, TokenUsage};

const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 4096;

const JSON_ONLY_SUFFIX: &str =
    "\n\nRespond with a single JSON object only. Do not wrap it in markdown or add commentary.";

/// Anthropic-backed generation provider.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::new(api_key),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_credentials(creds: &ProviderCredentials) -> Result<Self, ProviderError> {
        creds.ensure_configured("anthropic")?;
        let mut provider = Self::new(creds.api_key.expose()).with_model(creds.model.clone());
        if let Some(url) = &creds.base_url {
            provider = provider.with_base_url(url.clone());
        }
        Ok(provider)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, prompt: &PromptPayload) -> MessagesRequest {
        let system = if prompt.json_mode {
            format!("{}{}", prompt.system, JSON_ONLY_SUFFIX)
        } else {
            prompt.system.clone()
        };

        let mut content = Vec::with_capacity(2);
        if let Some(url) = &prompt.image_url {
            content.push(ContentBlock::Image {
                source: ImageSource {
                    source_type: "url",
                    url: url.clone(),
                },
            });
        }
        content.push(ContentBlock::Text {
            text: prompt.user.clone(),
        });

        MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: prompt.temperature,
            system,
            messages: vec![Message {
                role: "user",
                content,
            }],
        }
    }
}

#[async_trait]
impl GenerationProvider for AnthropicProvider {
    async fn generate(&self, prompt: &PromptPayload) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after(&response),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        if status != 200 {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::from_status(status, message));
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::ParseError(e.to_string()))?;

        // Concatenate all text blocks
        let text = parsed
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        Ok(ProviderResponse::new(text, usage))
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    url: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
