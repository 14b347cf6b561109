//! Pipeline outcome types returned to callers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::types::{generation::TokenUsage, recipe::StructuredRecipe};

/// Pipeline stages, in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    KeyDerivation,
    CacheCheck,
    SemanticCheck,
    ContentAcquisition,
    PromptBuild,
    Generation,
    Normalization,
    Validation,
    CacheWrite,
    Total,
}

/// Per-stage elapsed milliseconds, in the order stages ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageTimings(IndexMap<Stage, u64>);

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage duration (accumulates if the stage ran twice).
    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        *self.0.entry(stage).or_insert(0) += elapsed.as_millis() as u64;
    }

    pub fn get(&self, stage: Stage) -> Option<u64> {
        self.0.get(&stage).copied()
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.0.contains_key(&stage)
    }

    /// Stages in the order they were recorded.
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.0.keys().copied()
    }
}

/// How the recipe content was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    /// Exact cache-key hit
    Cache,
    /// Embedding match against a stored recipe
    SemanticMatch,
    /// Structured page extraction by the acquisition service
    Scrape,
    /// Acquisition service fell back to a degraded extraction path
    ScrapeFallback,
    /// Short-video caption
    VideoCaption,
    /// Request text used as-is
    InlineText,
}

/// A stored recipe offered for disambiguation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMatch {
    pub id: Uuid,
    pub cache_key: String,
    pub title: String,
    pub similarity: f32,
}

/// A validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReason {
    /// Rule identifier (stable, snake_case)
    pub rule: String,
    pub message: String,
}

impl ValidationReason {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Result of the Validation Gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub accepted: bool,
    pub fatal_reasons: Vec<ValidationReason>,
    pub informational_reasons: Vec<ValidationReason>,
}

impl ValidationOutcome {
    /// Whether a specific rule fired (fatal or informational).
    pub fn has_rule(&self, rule: &str) -> bool {
        self.fatal_reasons
            .iter()
            .chain(self.informational_reasons.iter())
            .any(|r| r.rule == rule)
    }

    /// Fatal reasons joined for a caller-facing message.
    pub fn summary(&self) -> String {
        self.fatal_reasons
            .iter()
            .map(|r| r.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Caller-facing failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub code: ErrorCode,
    pub message: String,
}

/// Result of one `ParseRecipe` call.
///
/// Exactly one of `recipe` and `error` is set; the constructors enforce it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOutcome {
    pub recipe: Option<StructuredRecipe>,
    pub error: Option<ParseFailure>,
    pub from_cache: bool,
    pub cache_key: String,
    pub timings: StageTimings,
    pub usage: TokenUsage,
    pub estimated_cost_usd: f64,
    /// Provider that served generation, if generation ran
    pub provider: Option<String>,
    pub fetch_method_used: Option<FetchMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_matches: Option<Vec<CandidateMatch>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationOutcome>,
}

impl ParseOutcome {
    /// Successful outcome.
    pub fn success(cache_key: impl Into<String>, recipe: StructuredRecipe) -> Self {
        Self {
            recipe: Some(recipe),
            error: None,
            from_cache: false,
            cache_key: cache_key.into(),
            timings: StageTimings::new(),
            usage: TokenUsage::default(),
            estimated_cost_usd: 0.0,
            provider: None,
            fetch_method_used: None,
            candidate_matches: None,
            validation: None,
        }
    }

    /// Failed outcome.
    pub fn failure(
        cache_key: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipe: None,
            error: Some(ParseFailure {
                code,
                message: message.into(),
            }),
            from_cache: false,
            cache_key: cache_key.into(),
            timings: StageTimings::new(),
            usage: TokenUsage::default(),
            estimated_cost_usd: 0.0,
            provider: None,
            fetch_method_used: None,
            candidate_matches: None,
            validation: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.recipe.is_some()
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}
