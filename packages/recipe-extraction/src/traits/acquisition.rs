//! Content acquisition traits.
//!
//! The pipeline never scrapes pages itself. A [`ContentFetcher`] turns a
//! recipe URL into [`ExtractedContent`], and a [`CaptionScraper`] turns a
//! short-video link into its caption text.

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::types::content::{ExtractedContent, VideoCaption};

/// Fetches structured recipe content for a web page.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch and extract recipe content from a URL.
    ///
    /// Failures are classified as retryable (timeouts, 429, 5xx) or fatal
    /// (4xx, unsupported content, empty result).
    async fn fetch(&self, url: &str) -> FetchResult<ExtractedContent>;

    /// Name of this fetcher, for logs.
    fn name(&self) -> &str;
}

/// Scrapes the caption of a short-video post.
#[async_trait]
pub trait CaptionScraper: Send + Sync {
    async fn scrape_caption(&self, video_url: &str) -> FetchResult<VideoCaption>;

    fn name(&self) -> &str;
}
