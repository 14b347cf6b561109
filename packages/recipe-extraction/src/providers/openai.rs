//! OpenAI chat-completions provider.
//!
//! Also serves as the reference [`Embedder`] (text-embedding-3-small).
//!
//! # Example
//!
//! ```rust,ignore
//! use recipe_extraction::providers::OpenAIProvider;
//!
//! let primary = OpenAIProvider::new("sk-...").with_model("gpt-4o-mini");
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, ProviderError};
use crate::providers::credentials::{ProviderCredentials, SecretString};
use crate::traits::{embedder::Embedder, provider::GenerationProvider};
use crate::types::generation::{PromptPayload, ProviderResponse, TokenUsage};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_OUTPUT_TOKENS: u32 = 4096;

/// OpenAI-backed generation provider.
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    embedding_model: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::new(api_key),
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Build from credentials, rejecting a blank key.
    pub fn from_credentials(creds: &ProviderCredentials) -> Result<Self, ProviderError> {
        creds.ensure_configured("openai")?;
        let mut provider = Self::new(creds.api_key.expose()).with_model(creds.model.clone());
        if let Some(url) = &creds.base_url {
            provider = provider.with_base_url(url.clone());
        }
        Ok(provider)
    }

    /// Set the chat model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the embedding model (default: text-embedding-3-small).
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, prompt: &PromptPayload) -> ChatRequest {
        let user_content = match &prompt.image_url {
            Some(url) => MessageContent::Parts(vec![
                ContentPart::Text {
                    text: prompt.user.clone(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: url.clone() },
                },
            ]),
            None => MessageContent::Text(prompt.user.clone()),
        };

        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(prompt.system.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            temperature: prompt.temperature,
            max_tokens: MAX_OUTPUT_TOKENS,
            response_format: prompt.json_mode.then(|| ResponseFormat {
                format_type: "json_object",
            }),
        }
    }
}

#[async_trait]
impl GenerationProvider for OpenAIProvider {
    async fn generate(&self, prompt: &PromptPayload) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
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

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::from_status(status, message));
        }

        let chat: ChatResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let usage = chat
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(ProviderResponse::new(text, usage))
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAIProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::RequestFailed(format!(
                "OpenAI embedding error {}: {}",
                status, error_text
            )));
        }

        let embed_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))?;

        embed_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or(EmbeddingError::Empty)
    }
}

pub(crate) fn retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_builder() {
        let provider = OpenAIProvider::new("sk-test")
            .with_model("gpt-4o")
            .with_embedding_model("text-embedding-3-large")
            .with_base_url("https://proxy.example.com/v1/");

        assert_eq!(provider.model, "gpt-4o");
        assert_eq!(provider.embedding_model, "text-embedding-3-large");
        assert_eq!(provider.base_url, "https://proxy.example.com/v1");
    }

    #[test]
    fn test_request_shape_json_mode_and_image() {
        let provider = OpenAIProvider::new("sk-test");
        let prompt = PromptPayload::new("system text", "user text").with_image("https://img/1.jpg");

        let json = serde_json::to_value(provider.build_request(&prompt)).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "system text");
        assert_eq!(json["messages"][1]["content"][0]["type"], "text");
        assert_eq!(json["messages"][1]["content"][1]["type"], "image_url");
        assert_eq!(
            json["messages"][1]["content"][1]["image_url"]["url"],
            "https://img/1.jpg"
        );
    }

    #[test]
    fn test_request_shape_plain() {
        let provider = OpenAIProvider::new("sk-test");
        let prompt = PromptPayload::new("s", "u").with_json_mode(false);

        let json = serde_json::to_value(provider.build_request(&prompt)).unwrap();
        assert!(json.get("response_format").is_none());
        assert_eq!(json["messages"][1]["content"], "u");
    }

    #[test]
    fn test_usage_mapping() {
        let body = r#"{
            "choices": [{"message": {"content": "{\"title\":\"x\"}"}}],
            "usage": {"prompt_tokens": 812, "completion_tokens": 240, "total_tokens": 1052}
        }"#;
        let chat: ChatResponse = serde_json::from_str(body).unwrap();
        let usage = chat.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 812);
        assert_eq!(usage.completion_tokens, 240);
    }

    #[test]
    fn test_blank_credentials_rejected() {
        let creds = ProviderCredentials::new("", "gpt-4o-mini");
        assert!(OpenAIProvider::from_credentials(&creds).is_err());
    }
}
