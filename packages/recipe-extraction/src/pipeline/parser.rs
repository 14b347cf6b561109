//! The recipe parser - main entry point of the pipeline.
//!
//! One call walks a request through:
//!
//! ```text
//! key → cache → [semantic] → acquire → prompt → generate → normalize → validate → write
//! ```
//!
//! Every terminal state, success or failure, is a [`ParseOutcome`] carrying
//! per-stage timings and token accounting. Stage errors never escape as
//! `Err`; they become caller-facing [`ErrorCode`]s.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::cache_key::derive_cache_key;
use crate::error::{ErrorCode, StoreError, StoreResult};
use crate::pipeline::{
    normalize::normalize_response,
    prompts::{prompt_version, PromptBuilder},
    semantic::{SemanticMatch, SemanticMatcher},
    single_flight::KeyedLocks,
};
use crate::providers::FallbackGenerator;
use crate::traits::{
    acquisition::{CaptionScraper, ContentFetcher},
    embedder::Embedder,
    store::{NewCacheRecord, RecipeStore},
};
use crate::types::{
    config::PipelineConfig,
    content::{ExtractedContent, VideoCaption},
    generation::{PromptPayload, TokenUsage},
    input::{InputKind, RawInput},
    outcome::{
        CandidateMatch, FetchMethod, ParseOutcome, Stage, StageTimings, ValidationOutcome,
    },
    recipe::StructuredRecipe,
};
use crate::validation::{validate_recipe, ValidationContext};

/// Collaborators the parser is wired with, built once at startup.
pub struct PipelineDeps {
    pub generator: FallbackGenerator,
    pub store: Arc<dyn RecipeStore>,
    pub fetcher: Arc<dyn ContentFetcher>,
    pub caption_scraper: Option<Arc<dyn CaptionScraper>>,
    /// Enables semantic matching and embedding backfill
    pub embedder: Option<Arc<dyn Embedder>>,
    pub config: PipelineConfig,
}

impl PipelineDeps {
    pub fn new(
        generator: FallbackGenerator,
        store: Arc<dyn RecipeStore>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        Self {
            generator,
            store,
            fetcher,
            caption_scraper: None,
            embedder: None,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_caption_scraper(mut self, scraper: Arc<dyn CaptionScraper>) -> Self {
        self.caption_scraper = Some(scraper);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }
}

/// A `ParseRecipe` request as received from a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseRequest {
    pub input: String,
    #[serde(default)]
    pub force_refresh: bool,
}

impl ParseRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            force_refresh: false,
        }
    }

    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Raw input with the kind inferred from the payload.
    pub fn raw_input(&self) -> RawInput {
        RawInput::infer(self.input.as_str()).with_force_refresh(self.force_refresh)
    }
}

/// Per-request accounting, folded into the outcome at the end.
struct RunState {
    started: Instant,
    timings: StageTimings,
    usage: TokenUsage,
    estimated_cost_usd: f64,
    provider: Option<String>,
    fetch_method: Option<FetchMethod>,
    validation: Option<ValidationOutcome>,
}

impl RunState {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            timings: StageTimings::new(),
            usage: TokenUsage::default(),
            estimated_cost_usd: 0.0,
            provider: None,
            fetch_method: None,
            validation: None,
        }
    }

    fn record(&mut self, stage: Stage, since: Instant) {
        self.timings.record(stage, since.elapsed());
    }
}

/// A recipe the request resolved to.
struct Resolved {
    recipe: StructuredRecipe,
    from_cache: bool,
    candidates: Option<Vec<CandidateMatch>>,
}

/// Why the request ended without a recipe.
struct Rejection {
    code: ErrorCode,
    message: String,
    candidates: Option<Vec<CandidateMatch>>,
}

impl Rejection {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            candidates: None,
        }
    }
}

/// Source material a prompt is built from.
enum Material {
    Page(ExtractedContent),
    Caption(VideoCaption),
    Text,
}

/// What acquisition learned about the source.
struct Acquired {
    material: Material,
    context: ValidationContext,
    source_url: Option<String>,
    image: Option<String>,
}

/// Drives requests through the extraction pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let parser = RecipeParser::new(deps);
///
/// let outcome = parser.parse(ParseRequest::new("https://example.com/lasagna")).await;
/// if let Some(recipe) = outcome.recipe {
///     println!("{} ({} ingredients)", recipe.title, recipe.ingredient_count());
/// }
/// ```
pub struct RecipeParser {
    generator: FallbackGenerator,
    store: Arc<dyn RecipeStore>,
    fetcher: Arc<dyn ContentFetcher>,
    caption_scraper: Option<Arc<dyn CaptionScraper>>,
    embedder: Option<Arc<dyn Embedder>>,
    semantic: Option<SemanticMatcher>,
    prompts: PromptBuilder,
    locks: KeyedLocks,
    config: PipelineConfig,
    prompt_version: String,
}

impl RecipeParser {
    pub fn new(deps: PipelineDeps) -> Self {
        let semantic = deps
            .embedder
            .clone()
            .map(|embedder| SemanticMatcher::new(embedder, deps.store.clone(), &deps.config));

        Self {
            generator: deps.generator,
            store: deps.store,
            fetcher: deps.fetcher,
            caption_scraper: deps.caption_scraper,
            embedder: deps.embedder,
            semantic,
            prompts: PromptBuilder::from_config(&deps.config),
            locks: KeyedLocks::new(),
            config: deps.config,
            prompt_version: prompt_version(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Version tag of the system prompt in use.
    pub fn prompt_version(&self) -> &str {
        &self.prompt_version
    }

    /// Parse a caller request, inferring the input kind.
    pub async fn parse(&self, request: ParseRequest) -> ParseOutcome {
        self.parse_input(request.raw_input()).await
    }

    /// Parse an input whose kind is already known.
    pub async fn parse_input(&self, input: RawInput) -> ParseOutcome {
        let mut state = RunState::new();

        if let Err(message) = check_input(&input) {
            let outcome = ParseOutcome::failure("", ErrorCode::InvalidInput, message);
            return self.finish(outcome, state);
        }

        let started = Instant::now();
        let cache_key = derive_cache_key(&input);
        state.record(Stage::KeyDerivation, started);
        debug!(cache_key = %cache_key, kind = input.kind.as_str(), "Derived cache key");

        let outcome = match self.run(&input, &cache_key, &mut state).await {
            Ok(resolved) => {
                let mut outcome = ParseOutcome::success(cache_key.as_str(), resolved.recipe);
                outcome.from_cache = resolved.from_cache;
                outcome.candidate_matches = resolved.candidates;
                outcome
            }
            Err(rejection) => {
                let mut outcome =
                    ParseOutcome::failure(cache_key.as_str(), rejection.code, rejection.message);
                outcome.candidate_matches = rejection.candidates;
                outcome
            }
        };

        self.finish(outcome, state)
    }

    async fn run(
        &self,
        input: &RawInput,
        cache_key: &str,
        state: &mut RunState,
    ) -> Result<Resolved, Rejection> {
        if let Some(hit) = self.check_cache(input, cache_key, state).await {
            return Ok(hit);
        }

        // Held until the write finishes so concurrent identical requests
        // wait and then find the cached result.
        let _guard = if self.config.single_flight {
            let guard = self.locks.lock(cache_key).await;
            if let Some(hit) = self.check_cache(input, cache_key, state).await {
                debug!(cache_key = %cache_key, "Cache filled while waiting for key lock");
                return Ok(hit);
            }
            Some(guard)
        } else {
            None
        };

        if let Some(resolved) = self.check_semantic(input, state).await? {
            return Ok(resolved);
        }

        let started = Instant::now();
        let acquired = self.acquire(input, cache_key, state).await;
        state.record(Stage::ContentAcquisition, started);
        let acquired = acquired?;

        let started = Instant::now();
        let prompt = self.build_prompt(input, &acquired.material);
        state.record(Stage::PromptBuild, started);

        let recipe = self.generate(&prompt, cache_key, state).await?;
        let recipe = self.validate(recipe, &acquired, state)?;

        let started = Instant::now();
        let recipe = self.write(cache_key, input.kind, recipe).await;
        state.record(Stage::CacheWrite, started);

        Ok(Resolved {
            recipe,
            from_cache: false,
            candidates: None,
        })
    }

    /// Exact-key lookup. Read failures degrade to a miss.
    async fn check_cache(
        &self,
        input: &RawInput,
        cache_key: &str,
        state: &mut RunState,
    ) -> Option<Resolved> {
        if input.force_refresh {
            return None;
        }

        let started = Instant::now();
        let lookup = self.store_call(self.store.get_by_key(cache_key)).await;
        state.record(Stage::CacheCheck, started);

        match lookup {
            Ok(Some(record)) => {
                debug!(cache_key = %cache_key, record_id = %record.id, "Cache hit");
                state.fetch_method = Some(FetchMethod::Cache);
                let mut recipe = record.recipe;
                recipe.id.get_or_insert_with(|| record.id.to_string());
                Some(Resolved {
                    recipe,
                    from_cache: true,
                    candidates: None,
                })
            }
            Ok(None) => None,
            Err(e) => {
                warn!(cache_key = %cache_key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Embedding lookup for dish-name queries.
    async fn check_semantic(
        &self,
        input: &RawInput,
        state: &mut RunState,
    ) -> Result<Option<Resolved>, Rejection> {
        let Some(matcher) = &self.semantic else {
            return Ok(None);
        };
        if input.force_refresh || !input.is_dish_name_query() {
            return Ok(None);
        }

        let started = Instant::now();
        let found = matcher.find(input.payload.trim()).await;
        state.record(Stage::SemanticCheck, started);

        let candidates = found.candidates();
        match found {
            SemanticMatch::None => Ok(None),
            SemanticMatch::Single(hit) => {
                debug!(record_id = %hit.record.id, score = hit.score, "Semantic match");
                state.fetch_method = Some(FetchMethod::SemanticMatch);
                let mut recipe = hit.record.recipe;
                recipe.id.get_or_insert_with(|| hit.record.id.to_string());
                Ok(Some(Resolved {
                    recipe,
                    from_cache: true,
                    candidates: Some(candidates),
                }))
            }
            SemanticMatch::Multiple(hits) => {
                state.fetch_method = Some(FetchMethod::SemanticMatch);
                Err(Rejection {
                    code: ErrorCode::AmbiguousMatch,
                    message: format!(
                        "{} stored recipes match \"{}\"; choose one",
                        hits.len(),
                        input.payload.trim()
                    ),
                    candidates: Some(candidates),
                })
            }
        }
    }

    /// Obtain source content for a request.
    async fn acquire(
        &self,
        input: &RawInput,
        cache_key: &str,
        state: &mut RunState,
    ) -> Result<Acquired, Rejection> {
        let payload = input.payload.trim();
        let fetch_timeout = self.config.fetch_timeout();

        match input.kind {
            InputKind::Url => {
                let content = with_timeout(fetch_timeout, self.fetcher.fetch(payload))
                    .await
                    .ok_or_else(|| {
                        Rejection::new(
                            ErrorCode::FetchFailed,
                            format!("timed out fetching {}", payload),
                        )
                    })?
                    .map_err(|e| {
                        warn!(
                            cache_key = %cache_key,
                            fetcher = self.fetcher.name(),
                            retryable = e.is_retryable(),
                            error = %e,
                            "Content fetch failed"
                        );
                        Rejection::new(ErrorCode::FetchFailed, e.to_string())
                    })?;

                if !content.has_content() {
                    return Err(Rejection::new(
                        ErrorCode::FetchFailed,
                        format!("no recipe content found at {}", payload),
                    ));
                }

                let (method, context) = if content.is_fallback_extraction {
                    (FetchMethod::ScrapeFallback, ValidationContext::fallback())
                } else {
                    (FetchMethod::Scrape, ValidationContext::default())
                };
                state.fetch_method = Some(method);

                let source_url = if content.source_url.is_empty() {
                    payload.to_string()
                } else {
                    content.source_url.clone()
                };

                Ok(Acquired {
                    image: content.image.clone(),
                    material: Material::Page(content),
                    context,
                    source_url: Some(source_url),
                })
            }
            InputKind::Video => {
                let scraper = self.caption_scraper.as_ref().ok_or_else(|| {
                    Rejection::new(ErrorCode::FetchFailed, "video captions are not supported")
                })?;

                let caption = with_timeout(fetch_timeout, scraper.scrape_caption(payload))
                    .await
                    .ok_or_else(|| {
                        Rejection::new(
                            ErrorCode::FetchFailed,
                            format!("timed out fetching caption for {}", payload),
                        )
                    })?
                    .map_err(|e| {
                        warn!(
                            cache_key = %cache_key,
                            scraper = scraper.name(),
                            error = %e,
                            "Caption scrape failed"
                        );
                        Rejection::new(ErrorCode::FetchFailed, e.to_string())
                    })?;

                if !caption.has_caption() {
                    let reason = caption.error.as_deref().unwrap_or("caption is empty");
                    return Err(Rejection::new(
                        ErrorCode::FetchFailed,
                        format!("no usable caption for {}: {}", payload, reason),
                    ));
                }

                state.fetch_method = Some(FetchMethod::VideoCaption);
                Ok(Acquired {
                    material: Material::Caption(caption),
                    context: ValidationContext::default(),
                    source_url: Some(payload.to_string()),
                    image: None,
                })
            }
            InputKind::Text => {
                state.fetch_method = Some(FetchMethod::InlineText);
                Ok(Acquired {
                    material: Material::Text,
                    context: ValidationContext::default(),
                    source_url: None,
                    image: None,
                })
            }
        }
    }

    fn build_prompt(&self, input: &RawInput, material: &Material) -> PromptPayload {
        let payload = input.payload.trim();
        match material {
            Material::Page(content) => self.prompts.build_url_prompt(content),
            Material::Caption(caption) => self.prompts.build_video_prompt(caption, payload),
            Material::Text if input.is_dish_name_query() => {
                self.prompts.build_dish_name_prompt(payload)
            }
            Material::Text => self.prompts.build_text_prompt(payload),
        }
    }

    /// Generate with fallback and normalize the output.
    async fn generate(
        &self,
        prompt: &PromptPayload,
        cache_key: &str,
        state: &mut RunState,
    ) -> Result<StructuredRecipe, Rejection> {
        let started = Instant::now();
        let generated = self.generator.generate(prompt).await;
        state.record(Stage::Generation, started);

        let result = generated.map_err(|e| {
            warn!(cache_key = %cache_key, error = %e, "Generation failed");
            Rejection::new(ErrorCode::GenerationFailed, e.to_string())
        })?;

        debug!(
            cache_key = %cache_key,
            provider = %result.provider,
            model = %result.model,
            used_fallback = result.used_fallback,
            prompt_version = %self.prompt_version,
            "Generation finished"
        );
        state.usage = result.usage;
        state.estimated_cost_usd = result.estimated_cost_usd;
        state.provider = Some(result.provider);

        let started = Instant::now();
        let normalized = normalize_response(&result.text);
        state.record(Stage::Normalization, started);

        let recipe = normalized.map_err(|e| {
            warn!(
                cache_key = %cache_key,
                error = %e,
                raw_len = e.raw.len(),
                "Provider output could not be normalized"
            );
            Rejection::new(ErrorCode::GenerationFailed, e.message)
        })?;

        if recipe.is_structurally_empty() {
            return Err(Rejection::new(
                ErrorCode::GenerationEmpty,
                "no recipe could be extracted from the input",
            ));
        }
        Ok(recipe)
    }

    /// Fill source fields and run the validation gate.
    fn validate(
        &self,
        mut recipe: StructuredRecipe,
        acquired: &Acquired,
        state: &mut RunState,
    ) -> Result<StructuredRecipe, Rejection> {
        if recipe.source_url.is_none() {
            recipe.source_url = acquired.source_url.clone();
        }
        if recipe.image.is_none() {
            recipe.image = acquired.image.clone();
        }

        let started = Instant::now();
        let validation = validate_recipe(&recipe, &acquired.context);
        state.record(Stage::Validation, started);

        let accepted = validation.accepted;
        let summary = validation.summary();
        state.validation = Some(validation);

        if !accepted {
            return Err(Rejection::new(ErrorCode::FinalValidationFailed, summary));
        }
        Ok(recipe)
    }

    /// Persist an accepted recipe. Write failures are logged, never surfaced.
    async fn write(
        &self,
        cache_key: &str,
        kind: InputKind,
        recipe: StructuredRecipe,
    ) -> StructuredRecipe {
        match self.persist(cache_key, kind, recipe.clone()).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(cache_key = %cache_key, error = %e, "Failed to write recipe to cache");
                recipe
            }
        }
    }

    async fn persist(
        &self,
        cache_key: &str,
        kind: InputKind,
        recipe: StructuredRecipe,
    ) -> StoreResult<StructuredRecipe> {
        // Previous record for the key (forced refresh) becomes the parent
        let parent = match self.store_call(self.store.get_by_key(cache_key)).await {
            Ok(existing) => existing.map(|r| r.id),
            Err(e) => {
                warn!(cache_key = %cache_key, error = %e, "Parent lookup failed");
                None
            }
        };

        let mut new_record = NewCacheRecord::new(cache_key, kind, recipe);
        if let Some(parent_id) = parent {
            new_record = new_record.with_parent(parent_id);
        }

        let record = self.store_call(self.store.insert(new_record)).await?;
        let mut recipe = record.recipe;
        recipe.id = Some(record.id.to_string());
        self.store_call(self.store.update_recipe(record.id, &recipe))
            .await?;

        debug!(cache_key = %cache_key, record_id = %record.id, "Recipe cached");
        self.spawn_embedding_backfill(record.id, &recipe);
        Ok(recipe)
    }

    /// Embed title + description in the background.
    fn spawn_embedding_backfill(&self, id: Uuid, recipe: &StructuredRecipe) {
        let Some(embedder) = self.embedder.clone() else {
            return;
        };
        let store = self.store.clone();
        let text = recipe.embedding_text();
        let embedding_timeout = self.config.embedding_timeout();
        let store_timeout = self.config.store_timeout();

        tokio::spawn(async move {
            let embedding = match with_timeout(embedding_timeout, embedder.embed(&text)).await {
                Some(Ok(embedding)) => embedding,
                Some(Err(e)) => {
                    warn!(record_id = %id, error = %e, "Embedding backfill failed");
                    return;
                }
                None => {
                    warn!(record_id = %id, "Embedding backfill timed out");
                    return;
                }
            };

            match with_timeout(store_timeout, store.set_embedding(id, &embedding)).await {
                Some(Ok(())) => debug!(record_id = %id, "Embedding stored"),
                Some(Err(e)) => warn!(record_id = %id, error = %e, "Failed to store embedding"),
                None => warn!(record_id = %id, "Storing embedding timed out"),
            }
        });
    }

    async fn store_call<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        with_timeout(self.config.store_timeout(), call)
            .await
            .unwrap_or(Err(StoreError::Timeout))
    }

    fn finish(&self, mut outcome: ParseOutcome, mut state: RunState) -> ParseOutcome {
        state.timings.record(Stage::Total, state.started.elapsed());

        outcome.timings = state.timings;
        outcome.usage = state.usage;
        outcome.estimated_cost_usd = state.estimated_cost_usd;
        outcome.provider = state.provider;
        outcome.fetch_method_used = state.fetch_method;
        outcome.validation = state.validation;

        let elapsed_ms = outcome.timings.get(Stage::Total).unwrap_or(0);
        match &outcome.error {
            None => info!(
                cache_key = %outcome.cache_key,
                from_cache = outcome.from_cache,
                fetch_method = ?outcome.fetch_method_used,
                provider = ?outcome.provider,
                input_tokens = outcome.usage.input_tokens,
                output_tokens = outcome.usage.output_tokens,
                estimated_cost_usd = outcome.estimated_cost_usd,
                prompt_version = %self.prompt_version,
                elapsed_ms,
                "Recipe parsed"
            ),
            Some(failure) => info!(
                cache_key = %outcome.cache_key,
                code = %failure.code,
                message = %failure.message,
                provider = ?outcome.provider,
                prompt_version = %self.prompt_version,
                elapsed_ms,
                "Recipe parse failed"
            ),
        }

        outcome
    }
}

/// Reject empty payloads and URL kinds that do not parse as http(s).
fn check_input(input: &RawInput) -> Result<(), String> {
    let payload = input.payload.trim();
    if payload.is_empty() {
        return Err("input is empty".to_string());
    }

    if matches!(input.kind, InputKind::Url | InputKind::Video) {
        let valid = Url::parse(payload)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .unwrap_or(false);
        if !valid {
            return Err(format!("not a valid http(s) URL: {}", payload));
        }
    }
    Ok(())
}

/// `None` when the deadline passed.
async fn with_timeout<T>(limit: Duration, fut: impl Future<Output = T>) -> Option<T> {
    tokio::time::timeout(limit, fut).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, ProviderError};
    use crate::stores::MemoryStore;
    use crate::testing::{
        sample_recipe_json, MockCaptionScraper, MockEmbedder, MockFetcher, MockProvider,
    };
    use crate::types::content::{ExtractedContent, VideoCaption};

    struct Harness {
        primary: Arc<MockProvider>,
        store: Arc<MemoryStore>,
        parser: RecipeParser,
    }

    fn harness(primary: MockProvider, fetcher: MockFetcher) -> Harness {
        let primary = Arc::new(primary);
        let store = Arc::new(MemoryStore::new());
        let deps = PipelineDeps::new(
            FallbackGenerator::new(primary.clone()),
            store.clone(),
            Arc::new(fetcher),
        );
        Harness {
            primary,
            store,
            parser: RecipeParser::new(deps),
        }
    }

    fn page(url: &str) -> ExtractedContent {
        ExtractedContent::new(url)
            .with_title("Weeknight Spaghetti")
            .with_ingredients("400g spaghetti\n800g crushed tomatoes\n3 garlic cloves")
            .with_instructions("Simmer the sauce. Cook the pasta. Combine.")
    }

    #[tokio::test]
    async fn test_empty_input_is_invalid() {
        let h = harness(MockProvider::new("openai"), MockFetcher::new());
        let outcome = h.parser.parse(ParseRequest::new("   ")).await;

        assert_eq!(outcome.error_code(), Some(ErrorCode::InvalidInput));
        assert!(outcome.timings.contains(Stage::Total));
        assert_eq!(h.primary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_kind() {
        let h = harness(MockProvider::new("openai"), MockFetcher::new());
        let outcome = h
            .parser
            .parse_input(RawInput::new(InputKind::Url, "ftp://example.com/file"))
            .await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::InvalidInput));
    }

    #[tokio::test]
    async fn test_url_success_is_cached() {
        let url = "https://example.com/spaghetti";
        let h = harness(
            MockProvider::new("openai").with_response(sample_recipe_json("Weeknight Spaghetti")),
            MockFetcher::new().with_content(url, page(url)),
        );

        let outcome = h.parser.parse(ParseRequest::new(url)).await;

        assert!(outcome.is_success(), "{:?}", outcome.error);
        assert!(!outcome.from_cache);
        assert_eq!(outcome.fetch_method_used, Some(FetchMethod::Scrape));
        assert_eq!(outcome.provider.as_deref(), Some("openai"));
        assert_eq!(outcome.usage.input_tokens, 100);

        let recipe = outcome.recipe.unwrap();
        assert!(recipe.id.is_some());
        assert_eq!(recipe.source_url.as_deref(), Some(url));
        assert_eq!(h.store.record_count(), 1);

        let stored = h.store.get_by_key(&outcome.cache_key).await.unwrap().unwrap();
        assert_eq!(stored.recipe.id, Some(stored.id.to_string()));
    }

    #[tokio::test]
    async fn test_timings_follow_stage_order() {
        let h = harness(
            MockProvider::new("openai").with_response(sample_recipe_json("Lemon Cake")),
            MockFetcher::new(),
        );
        let outcome = h
            .parser
            .parse(ParseRequest::new(
                "Lemon cake\n200g flour\n2 eggs\n100g sugar\nMix everything and bake for 30 minutes.",
            ))
            .await;

        assert!(outcome.is_success());
        let stages: Vec<Stage> = outcome.timings.stages().collect();
        assert_eq!(
            stages,
            vec![
                Stage::KeyDerivation,
                Stage::CacheCheck,
                Stage::ContentAcquisition,
                Stage::PromptBuild,
                Stage::Generation,
                Stage::Normalization,
                Stage::Validation,
                Stage::CacheWrite,
                Stage::Total,
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_failure() {
        let url = "https://example.com/broken";
        let h = harness(
            MockProvider::new("openai"),
            MockFetcher::new().with_error(
                url,
                FetchError::Retryable {
                    url: url.to_string(),
                    message: "HTTP 503".to_string(),
                },
            ),
        );

        let outcome = h.parser.parse(ParseRequest::new(url)).await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::FetchFailed));
        assert_eq!(h.primary.call_count(), 0);
        assert_eq!(h.store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_output_is_generation_failed() {
        let h = harness(
            MockProvider::new("openai").with_response("Sorry, I cannot help with that."),
            MockFetcher::new(),
        );
        let outcome = h.parser.parse(ParseRequest::new("some recipe text")).await;

        assert_eq!(outcome.error_code(), Some(ErrorCode::GenerationFailed));
        assert_eq!(outcome.provider.as_deref(), Some("openai"));
    }

    #[tokio::test]
    async fn test_structurally_empty_recipe() {
        let h = harness(
            MockProvider::new("openai")
                .with_response(r#"{"title": "", "ingredientGroups": [], "instructions": []}"#),
            MockFetcher::new(),
        );
        let outcome = h
            .parser
            .parse(ParseRequest::new("the weather is lovely today, nothing to cook"))
            .await;

        assert_eq!(outcome.error_code(), Some(ErrorCode::GenerationEmpty));
        assert_eq!(h.store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_video_without_scraper() {
        let h = harness(MockProvider::new("openai"), MockFetcher::new());
        let outcome = h
            .parser
            .parse(ParseRequest::new("https://www.tiktok.com/@chef/video/123"))
            .await;
        assert_eq!(outcome.error_code(), Some(ErrorCode::FetchFailed));
    }

    #[tokio::test]
    async fn test_video_caption_path() {
        let url = "https://www.tiktok.com/@chef/video/123";
        let primary = Arc::new(
            MockProvider::new("openai").with_response(sample_recipe_json("Crispy Rice")),
        );
        let scraper = MockCaptionScraper::new().with_caption(
            url,
            VideoCaption::new("Crispy rice: 2 cups rice, 1 tbsp oil. Fry until golden.", "tiktok"),
        );
        let deps = PipelineDeps::new(
            FallbackGenerator::new(primary.clone()),
            Arc::new(MemoryStore::new()),
            Arc::new(MockFetcher::new()),
        )
        .with_caption_scraper(Arc::new(scraper));
        let parser = RecipeParser::new(deps);

        let outcome = parser.parse(ParseRequest::new(url)).await;
        assert!(outcome.is_success(), "{:?}", outcome.error);
        assert_eq!(outcome.fetch_method_used, Some(FetchMethod::VideoCaption));
        assert!(primary.calls()[0].user.contains("Crispy rice"));
    }

    #[tokio::test]
    async fn test_semantic_single_match_skips_generation() {
        let store = Arc::new(MemoryStore::new());
        let record = store
            .insert(NewCacheRecord::new(
                "text:seed",
                InputKind::Text,
                crate::testing::sample_recipe("Chicken Curry"),
            ))
            .await
            .unwrap();
        store.set_embedding(record.id, &[1.0, 0.0, 0.0]).await.unwrap();

        let primary = Arc::new(MockProvider::new("openai"));
        let embedder = MockEmbedder::new().with_embedding("chicken curry", vec![1.0, 0.0, 0.0]);
        let deps = PipelineDeps::new(
            FallbackGenerator::new(primary.clone()),
            store,
            Arc::new(MockFetcher::new()),
        )
        .with_embedder(Arc::new(embedder));
        let parser = RecipeParser::new(deps);

        let outcome = parser.parse(ParseRequest::new("chicken curry")).await;
        assert!(outcome.is_success());
        assert!(outcome.from_cache);
        assert_eq!(outcome.fetch_method_used, Some(FetchMethod::SemanticMatch));
        assert_eq!(outcome.recipe.unwrap().id, Some(record.id.to_string()));
        assert_eq!(primary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_error_without_secondary() {
        let h = harness(
            MockProvider::new("openai").with_error(ProviderError::Unavailable("down".into())),
            MockFetcher::new(),
        );
        let outcome = h.parser.parse(ParseRequest::new("pancakes with syrup")).await;

        assert_eq!(outcome.error_code(), Some(ErrorCode::GenerationFailed));
        assert!(outcome.recipe.is_none());
    }
}
