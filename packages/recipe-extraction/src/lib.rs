//! Recipe Extraction Library
//!
//! Turns a recipe page URL, free-form text, a dish name or a short-video
//! link into a validated, structured recipe by driving a text-generation
//! provider, with a secondary provider as fallback.
//!
//! # Design Philosophy
//!
//! - Cache first: identical inputs map to one cache key and one stored recipe
//! - Providers are interchangeable behind one trait
//! - Validation is a pure classifier over rule tables
//! - Every request ends in a `ParseOutcome`, never a panic or a bare error
//!
//! # Usage
//!
//! ```rust,ignore
//! use recipe_extraction::{FallbackGenerator, MemoryStore, ParseRequest, PipelineDeps, RecipeParser};
//! use recipe_extraction::testing::{MockFetcher, MockProvider};
//!
//! let generator = FallbackGenerator::new(Arc::new(MockProvider::new("primary")))
//!     .with_secondary(Arc::new(MockProvider::new("secondary")));
//! let deps = PipelineDeps::new(generator, Arc::new(MemoryStore::new()), Arc::new(MockFetcher::new()));
//! let parser = RecipeParser::new(deps);
//!
//! let outcome = parser.parse(ParseRequest::new("https://example.com/lasagna")).await;
//! ```
//!
//! # Modules
//!
//! - [`cache_key`] - Deterministic cache keys (URL canonicalization, text hashing)
//! - [`traits`] - Collaborator abstractions (providers, fetchers, stores, embedder)
//! - [`types`] - Inputs, recipes, outcomes and configuration
//! - [`pipeline`] - Prompts, normalization, semantic matching and the parser
//! - [`providers`] - OpenAI and Anthropic adapters, fallback, pricing, credentials
//! - [`validation`] - Hallucination heuristics
//! - [`acquisition`] - Clients for the extract and caption services
//! - [`stores`] - Cache store implementations (MemoryStore, SqliteStore)
//! - [`testing`] - Mock implementations for testing

pub mod acquisition;
pub mod cache_key;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;
pub mod validation;

// Re-export core types at crate root
pub use error::{
    EmbeddingError, ErrorCode, FetchError, GenerationError, NormalizeError, ProviderError,
    StoreError,
};
pub use traits::{
    acquisition::{CaptionScraper, ContentFetcher},
    embedder::Embedder,
    provider::GenerationProvider,
    store::{CacheRecord, NewCacheRecord, RecipeStore, ScoredRecord},
};
pub use types::{
    config::PipelineConfig,
    content::{ExtractedContent, VideoCaption},
    generation::{GenerationResult, PromptPayload, ProviderResponse, TokenUsage},
    input::{InputKind, RawInput},
    outcome::{
        CandidateMatch, FetchMethod, ParseFailure, ParseOutcome, Stage, StageTimings,
        ValidationOutcome, ValidationReason,
    },
    recipe::{Ingredient, IngredientGroup, Nutrition, StructuredRecipe},
};

// Re-export pipeline components
pub use cache_key::{canonicalize_url, derive_cache_key};
pub use pipeline::{
    normalize::normalize_response,
    prompts::{prompt_version, PromptBuilder},
    semantic::{SemanticMatch, SemanticMatcher},
    ParseRequest, PipelineDeps, RecipeParser,
};
pub use validation::{validate_recipe, ValidationContext};

// Re-export providers and clients
pub use acquisition::{CaptionServiceClient, ExtractServiceClient};
pub use providers::{
    AnthropicProvider, FallbackGenerator, OpenAIProvider, ProviderCredentials, SecretString,
};

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;
