//! JSON HTTP clients for the external acquisition services.
//!
//! The extract service turns a recipe page into [`ExtractedContent`]; the
//! caption service turns a short-video link into its caption. Neither client
//! parses HTML. HTTP failures are classified into retryable and fatal
//! [`FetchError`]s.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{FetchError, FetchResult};
use crate::providers::SecretString;
use crate::traits::acquisition::{CaptionScraper, ContentFetcher};
use crate::types::content::{ExtractedContent, VideoCaption};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct UrlRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ExtractedContent>,
    #[serde(default)]
    error: Option<String>,
}

/// Shared request plumbing for both services.
#[derive(Debug, Clone)]
struct ServiceClient {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl ServiceClient {
    fn new(base_url: impl Into<String>, timeout: Duration) -> FetchResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Fatal {
                url: base_url.clone(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    async fn post<R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        url: &str,
    ) -> FetchResult<R> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, endpoint))
            .header("Content-Type", "application/json")
            .json(&UrlRequest { url });

        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token.expose()));
        }

        let response = request.send().await.map_err(|e| classify_transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FetchError::from_status(url, status.as_u16(), text));
        }

        response.json().await.map_err(|e| FetchError::Fatal {
            url: url.to_string(),
            message: format!("unreadable service response: {}", e),
        })
    }
}

fn classify_transport(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_builder() {
        FetchError::Fatal {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        // Connection resets, DNS blips and the like
        FetchError::Retryable {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Client for the page-extraction service.
///
/// # Example
///
/// ```rust,ignore
/// use recipe_extraction::acquisition::ExtractServiceClient;
///
/// let fetcher = ExtractServiceClient::new("http://extract.internal:8081")?;
/// let content = fetcher.fetch("https://example.com/pasta").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ExtractServiceClient {
    inner: ServiceClient,
}

impl ExtractServiceClient {
    pub fn new(base_url: impl Into<String>) -> FetchResult<Self> {
        Ok(Self {
            inner: ServiceClient::new(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
        })
    }

    /// Send a bearer token with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.inner.token = Some(SecretString::new(token));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }
}

#[async_trait]
impl ContentFetcher for ExtractServiceClient {
    async fn fetch(&self, url: &str) -> FetchResult<ExtractedContent> {
        let response: ExtractResponse = self.inner.post("/extract", url).await?;
        interpret_extract(url, response)
    }

    fn name(&self) -> &str {
        "extract-service"
    }
}

fn interpret_extract(url: &str, response: ExtractResponse) -> FetchResult<ExtractedContent> {
    if !response.success {
        return Err(FetchError::Fatal {
            url: url.to_string(),
            message: response
                .error
                .unwrap_or_else(|| "extract service reported failure".to_string()),
        });
    }

    let mut content = response
        .data
        .filter(ExtractedContent::has_content)
        .ok_or_else(|| FetchError::Empty {
            url: url.to_string(),
        })?;

    if content.source_url.is_empty() {
        content.source_url = url.to_string();
    }
    Ok(content)
}

/// Client for the short-video caption service.
#[derive(Debug, Clone)]
pub struct CaptionServiceClient {
    inner: ServiceClient,
}

impl CaptionServiceClient {
    pub fn new(base_url: impl Into<String>) -> FetchResult<Self> {
        Ok(Self {
            inner: ServiceClient::new(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.inner.token = Some(SecretString::new(token));
        self
    }
}

#[async_trait]
impl CaptionScraper for CaptionServiceClient {
    async fn scrape_caption(&self, video_url: &str) -> FetchResult<VideoCaption> {
        let caption: VideoCaption = self.inner.post("/caption", video_url).await?;

        if let Some(error) = &caption.error {
            return Err(FetchError::Fatal {
                url: video_url.to_string(),
                message: error.clone(),
            });
        }
        if !caption.has_caption() {
            return Err(FetchError::Empty {
                url: video_url.to_string(),
            });
        }
        Ok(caption)
    }

    fn name(&self) -> &str {
        "caption-service"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_extract_success_fills_source_url() {
        let response: ExtractResponse = serde_json::from_str(
            r#"{"success": true, "data": {"title": "Pasta", "ingredientsText": "pasta", "sourceUrl": ""}}"#,
        )
        .unwrap();

        let content = interpret_extract("https://example.com/pasta", response).unwrap();
        assert_eq!(content.source_url, "https://example.com/pasta");
        assert_eq!(content.title.as_deref(), Some("Pasta"));
    }

    #[test]
    fn test_interpret_extract_failure_is_fatal() {
        let response: ExtractResponse =
            serde_json::from_str(r#"{"success": false, "error": "unsupported content type"}"#)
                .unwrap();

        let err = interpret_extract("https://example.com/file.pdf", response).unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("unsupported content type"));
    }

    #[test]
    fn test_interpret_extract_empty() {
        let response: ExtractResponse =
            serde_json::from_str(r#"{"success": true, "data": {"sourceUrl": "https://a.com"}}"#)
                .unwrap();

        assert!(matches!(
            interpret_extract("https://a.com", response),
            Err(FetchError::Empty { .. })
        ));
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = ExtractServiceClient::new("http://localhost:8081/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8081");
    }
}
