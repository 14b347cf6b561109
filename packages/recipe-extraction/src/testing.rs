//! Testing utilities including mock implementations.
//!
//! These let applications exercise the recipe pipeline without real
//! provider, acquisition or embedding calls. Every mock records its calls
//! for assertions.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{EmbeddingError, FetchError, FetchResult, ProviderError};
use crate::traits::{
    acquisition::{CaptionScraper, ContentFetcher},
    embedder::Embedder,
    provider::GenerationProvider,
};
use crate::types::{
    content::{ExtractedContent, VideoCaption},
    generation::{PromptPayload, ProviderResponse, TokenUsage},
    recipe::{Ingredient, IngredientGroup, Nutrition, StructuredRecipe},
};

/// A scripted generation provider.
///
/// Responses are consumed in order; the last one repeats once the script
/// runs out. With no script at all, every call fails with `EmptyResponse`.
pub struct MockProvider {
    name: String,
    model: String,
    script: Arc<RwLock<VecDeque<Result<String, ProviderError>>>>,
    usage: TokenUsage,
    delay: Option<Duration>,
    calls: Arc<RwLock<Vec<PromptPayload>>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: "mock-model".to_string(),
            script: Arc::new(RwLock::new(VecDeque::new())),
            usage: TokenUsage::new(100, 50),
            delay: None,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queue a successful response.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.script.write().unwrap().push_back(Ok(text.into()));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: ProviderError) -> Self {
        self.script.write().unwrap().push_back(Err(error));
        self
    }

    /// Token usage reported with every successful response.
    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.usage = TokenUsage::new(input_tokens, output_tokens);
        self
    }

    /// Sleep before answering (for timeout and concurrency tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received, in call order.
    pub fn calls(&self) -> Vec<PromptPayload> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    fn next_scripted(&self) -> Result<String, ProviderError> {
        let mut script = self.script.write().unwrap();
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        next.unwrap_or(Err(ProviderError::EmptyResponse))
    }
}

#[async_trait]
impl GenerationProvider for MockProvider {
    async fn generate(&self, prompt: &PromptPayload) -> Result<ProviderResponse, ProviderError> {
        self.calls.write().unwrap().push(prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_scripted()
            .map(|text| ProviderResponse::new(text, self.usage))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// A content fetcher that serves predefined pages.
///
/// Unknown URLs fail with `FetchError::Empty`.
#[derive(Default)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, FetchResult<ExtractedContent>>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(self, url: impl Into<String>, content: ExtractedContent) -> Self {
        self.pages.write().unwrap().insert(url.into(), Ok(content));
        self
    }

    pub fn with_error(self, url: impl Into<String>, error: FetchError) -> Self {
        self.pages.write().unwrap().insert(url.into(), Err(error));
        self
    }

    /// URLs fetched, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<ExtractedContent> {
        self.calls.write().unwrap().push(url.to_string());
        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::Empty {
                    url: url.to_string(),
                })
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A caption scraper that serves predefined captions.
#[derive(Default)]
pub struct MockCaptionScraper {
    captions: Arc<RwLock<HashMap<String, FetchResult<VideoCaption>>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockCaptionScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caption(self, url: impl Into<String>, caption: VideoCaption) -> Self {
        self.captions.write().unwrap().insert(url.into(), Ok(caption));
        self
    }

    pub fn with_error(self, url: impl Into<String>, error: FetchError) -> Self {
        self.captions.write().unwrap().insert(url.into(), Err(error));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl CaptionScraper for MockCaptionScraper {
    async fn scrape_caption(&self, video_url: &str) -> FetchResult<VideoCaption> {
        self.calls.write().unwrap().push(video_url.to_string());
        self.captions
            .read()
            .unwrap()
            .get(video_url)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::Empty {
                    url: video_url.to_string(),
                })
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// An embedder with predefined vectors and a deterministic fallback.
pub struct MockEmbedder {
    embeddings: Arc<RwLock<HashMap<String, Vec<f32>>>>,
    dimension: usize,
    failing: bool,
    calls: Arc<RwLock<Vec<String>>>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self {
            embeddings: Arc::new(RwLock::new(HashMap::new())),
            dimension: 8,
            failing: false,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predefined embedding for text.
    pub fn with_embedding(self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.embeddings
            .write()
            .unwrap()
            .insert(text.into(), embedding);
        self
    }

    /// Make every call fail.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Texts embedded, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// Generate a deterministic embedding based on text.
    fn deterministic_embedding(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let hash = Sha256::digest(text.as_bytes());
        (0..self.dimension)
            .map(|i| (hash[i % 32] as f32 / 127.5) - 1.0)
            .collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.write().unwrap().push(text.to_string());
        if self.failing {
            return Err(EmbeddingError::RequestFailed("mock embedder failure".into()));
        }
        Ok(self
            .embeddings
            .read()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.deterministic_embedding(text)))
    }
}

/// A well-formed recipe that passes every validation rule.
pub fn sample_recipe(title: &str) -> StructuredRecipe {
    StructuredRecipe {
        title: title.to_string(),
        description: Some(format!("A weeknight {} with pantry staples.", title.to_lowercase())),
        ingredient_groups: vec![
            IngredientGroup::new("Sauce")
                .with_ingredient(
                    Ingredient::new("crushed tomatoes")
                        .with_amount(28.0, "oz")
                        .with_substitution("tomato passata"),
                )
                .with_ingredient(
                    Ingredient::new("garlic cloves")
                        .with_amount(3.0, "cloves")
                        .with_substitution("garlic powder"),
                )
                .with_ingredient(
                    Ingredient::new("olive oil")
                        .with_amount(2.0, "tbsp")
                        .with_substitution("butter"),
                ),
            IngredientGroup::new("Pasta")
                .with_ingredient(
                    Ingredient::new("spaghetti")
                        .with_amount(1.0, "lb")
                        .with_substitution("linguine"),
                )
                .with_ingredient(
                    Ingredient::new("parmesan cheese")
                        .with_amount(0.5, "cup")
                        .with_substitution("pecorino romano"),
                ),
        ],
        instructions: vec![
            "Bring a large pot of salted water to a boil and cook the spaghetti until al dente."
                .to_string(),
            "Warm the olive oil in a skillet over medium heat and saute the sliced garlic for one minute."
                .to_string(),
            "Add the crushed tomatoes and simmer for fifteen minutes, stirring occasionally."
                .to_string(),
            "Toss the drained spaghetti with the sauce and top with grated parmesan.".to_string(),
        ],
        recipe_yield: Some("4 servings".to_string()),
        prep_time: Some("10 minutes".to_string()),
        cook_time: Some("25 minutes".to_string()),
        total_time: Some("35 minutes".to_string()),
        nutrition: Some(Nutrition {
            calories: Some(520.0),
            protein: Some("18g".to_string()),
            ..Default::default()
        }),
        tips: vec!["Reserve a cup of pasta water to loosen the sauce.".to_string()],
        ..Default::default()
    }
}

/// [`sample_recipe`] serialized the way a provider would return it.
pub fn sample_recipe_json(title: &str) -> String {
    serde_json::to_string(&sample_recipe(title)).unwrap_or_default()
}
