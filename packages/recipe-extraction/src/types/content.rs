//! Content produced by the acquisition collaborators.

use serde::{Deserialize, Serialize};

/// Recipe content extracted from a web page.
///
/// Produced once per request by a [`ContentFetcher`](crate::traits::acquisition::ContentFetcher).
/// Every field except `source_url` is optional because pages vary wildly
/// in what they expose.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedContent {
    #[serde(default)]
    pub title: Option<String>,

    /// Ingredient lines as text (one per line)
    #[serde(default)]
    pub ingredients_text: Option<String>,

    /// Instruction text (steps separated by newlines)
    #[serde(default)]
    pub instructions_text: Option<String>,

    #[serde(default)]
    pub prep_time: Option<String>,

    #[serde(default)]
    pub cook_time: Option<String>,

    #[serde(default)]
    pub total_time: Option<String>,

    #[serde(default)]
    pub yield_text: Option<String>,

    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    pub source_url: String,

    /// Content came from a degraded extraction path (e.g. page text instead
    /// of structured recipe markup). Validation is stricter for these.
    #[serde(default)]
    pub is_fallback_extraction: bool,
}

impl ExtractedContent {
    /// Create empty content for a URL.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_ingredients(mut self, text: impl Into<String>) -> Self {
        self.ingredients_text = Some(text.into());
        self
    }

    pub fn with_instructions(mut self, text: impl Into<String>) -> Self {
        self.instructions_text = Some(text.into());
        self
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }

    pub fn with_yield(mut self, text: impl Into<String>) -> Self {
        self.yield_text = Some(text.into());
        self
    }

    pub fn with_times(
        mut self,
        prep: Option<&str>,
        cook: Option<&str>,
        total: Option<&str>,
    ) -> Self {
        self.prep_time = prep.map(String::from);
        self.cook_time = cook.map(String::from);
        self.total_time = total.map(String::from);
        self
    }

    /// Mark as produced by a degraded extraction path.
    pub fn as_fallback(mut self) -> Self {
        self.is_fallback_extraction = true;
        self
    }

    /// Check if there is anything worth prompting with.
    pub fn has_content(&self) -> bool {
        [
            &self.title,
            &self.ingredients_text,
            &self.instructions_text,
            &self.description,
        ]
        .iter()
        .any(|f| f.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// Caption scraped from a short-video post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoCaption {
    pub caption: String,

    /// Platform name (e.g. "tiktok", "instagram")
    pub platform: String,

    /// Scraper-reported problem, if any
    #[serde(default)]
    pub error: Option<String>,
}

impl VideoCaption {
    pub fn new(caption: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            platform: platform.into(),
            error: None,
        }
    }

    pub fn has_caption(&self) -> bool {
        self.error.is_none() && !self.caption.trim().is_empty()
    }
}
