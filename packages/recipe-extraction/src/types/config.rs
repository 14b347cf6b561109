//! Configuration for the recipe extraction pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the recipe extraction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Hard ceiling on prompt input characters.
    ///
    /// Longer content is truncated with an explicit marker. Default: 120,000.
    pub max_input_chars: usize,

    /// Sampling temperature for generation. Default: 0.2.
    pub temperature: f32,

    /// Similarity threshold for the first semantic search pass.
    ///
    /// Default: 0.85.
    pub semantic_threshold: f32,

    /// Relaxed threshold for the single retry pass when the first pass
    /// returns nothing. Default: 0.75.
    pub semantic_relaxed_threshold: f32,

    /// Max semantic candidates returned for disambiguation. Default: 5.
    pub semantic_limit: usize,

    /// Serialize concurrent requests for the same cache key.
    ///
    /// When true, a second identical request waits for the first and then
    /// reads its cached result instead of generating again. Default: true.
    pub single_flight: bool,

    /// Timeout for content acquisition (seconds). Default: 30.
    pub fetch_timeout_secs: u64,

    /// Timeout per generation provider call (seconds). Default: 60.
    pub generation_timeout_secs: u64,

    /// Timeout for a cache store operation (seconds). Default: 5.
    pub store_timeout_secs: u64,

    /// Timeout for an embedding call (seconds). Default: 10.
    pub embedding_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 120_000,
            temperature: 0.2,
            semantic_threshold: 0.85,
            semantic_relaxed_threshold: 0.75,
            semantic_limit: 5,
            single_flight: true,
            fetch_timeout_secs: 30,
            generation_timeout_secs: 60,
            store_timeout_secs: 5,
            embedding_timeout_secs: 10,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prompt input ceiling.
    pub fn with_max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = max;
        self
    }

    /// Set both semantic thresholds.
    pub fn with_semantic_thresholds(mut self, strict: f32, relaxed: f32) -> Self {
        self.semantic_threshold = strict;
        self.semantic_relaxed_threshold = relaxed;
        self
    }

    /// Enable or disable single-flight de-duplication.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    /// Set the generation timeout per provider call.
    pub fn with_generation_timeout(mut self, secs: u64) -> Self {
        self.generation_timeout_secs = secs;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }
}
