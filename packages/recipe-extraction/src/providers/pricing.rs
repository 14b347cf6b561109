//! Static per-provider pricing table.
//!
//! Rates are USD per 1,000 tokens. Rows are matched by provider tag and
//! model prefix, longest prefix first; unknown models use the provider's
//! default row (empty prefix).

use crate::types::generation::TokenUsage;

/// One pricing row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRate {
    pub provider: &'static str,
    pub model_prefix: &'static str,
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

const fn rate(
    provider: &'static str,
    model_prefix: &'static str,
    input_per_1k: f64,
    output_per_1k: f64,
) -> ModelRate {
    ModelRate {
        provider,
        model_prefix,
        input_per_1k,
        output_per_1k,
    }
}

pub const RATE_TABLE: &[ModelRate] = &[
    rate("openai", "gpt-4o-mini", 0.000_15, 0.000_6),
    rate("openai", "gpt-4o", 0.002_5, 0.01),
    rate("openai", "gpt-4.1-mini", 0.000_4, 0.001_6),
    rate("openai", "gpt-4.1", 0.002, 0.008),
    rate("openai", "", 0.002_5, 0.01),
    rate("anthropic", "claude-3-5-haiku", 0.000_8, 0.004),
    rate("anthropic", "claude-3-haiku", 0.000_25, 0.001_25),
    rate("anthropic", "claude-3-5-sonnet", 0.003, 0.015),
    rate("anthropic", "claude-sonnet-4", 0.003, 0.015),
    rate("anthropic", "", 0.003, 0.015),
];

/// Find the rate row for a provider/model pair.
pub fn lookup_rate(provider: &str, model: &str) -> Option<&'static ModelRate> {
    RATE_TABLE
        .iter()
        .filter(|r| r.provider == provider && model.starts_with(r.model_prefix))
        .max_by_key(|r| r.model_prefix.len())
}

/// Estimated USD cost of one call. Unknown providers cost 0.
pub fn estimate_cost(provider: &str, model: &str, usage: &TokenUsage) -> f64 {
    match lookup_rate(provider, model) {
        Some(r) => {
            (usage.input_tokens as f64 / 1000.0) * r.input_per_1k
                + (usage.output_tokens as f64 / 1000.0) * r.output_per_1k
        }
        None => 0.0,
    }
}
