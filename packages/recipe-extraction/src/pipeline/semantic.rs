//! Semantic matching of dish-name queries against stored recipes.
//!
//! Search runs at a strict threshold first, then once more at a relaxed
//! threshold if nothing matched. Embedding or search failures degrade to
//! "no match" so the caller falls through to generation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::traits::{
    embedder::Embedder,
    store::{RecipeStore, ScoredRecord},
};
use crate::types::{config::PipelineConfig, outcome::CandidateMatch};

/// Result of a semantic lookup.
#[derive(Debug, Clone)]
pub enum SemanticMatch {
    /// Nothing similar enough; generate
    None,
    /// Exactly one stored recipe matched
    Single(ScoredRecord),
    /// Several candidates; the caller must disambiguate
    Multiple(Vec<ScoredRecord>),
}

impl SemanticMatch {
    /// Candidates for the caller-facing outcome.
    pub fn candidates(&self) -> Vec<CandidateMatch> {
        let records: &[ScoredRecord] = match self {
            Self::None => &[],
            Self::Single(record) => std::slice::from_ref(record),
            Self::Multiple(records) => records,
        };
        records
            .iter()
            .map(|s| CandidateMatch {
                id: s.record.id,
                cache_key: s.record.cache_key.clone(),
                title: s.record.recipe.title.clone(),
                similarity: s.score,
            })
            .collect()
    }
}

/// Embeds a query and searches the store with threshold relaxation.
#[derive(Clone)]
pub struct SemanticMatcher {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn RecipeStore>,
    threshold: f32,
    relaxed_threshold: f32,
    limit: usize,
    embedding_timeout: Duration,
    store_timeout: Duration,
}

impl SemanticMatcher {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn RecipeStore>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            threshold: config.semantic_threshold,
            relaxed_threshold: config.semantic_relaxed_threshold,
            limit: config.semantic_limit,
            embedding_timeout: config.embedding_timeout(),
            store_timeout: config.store_timeout(),
        }
    }

    /// Look up stored recipes similar to `query`.
    pub async fn find(&self, query: &str) -> SemanticMatch {
        let lookup = self.embedder.embed(query);
        let embedding = match tokio::time::timeout(self.embedding_timeout, lookup).await {
            Ok(Ok(embedding)) => embedding,
            Ok(Err(e)) => {
                warn!(error = %e, "Query embedding failed, skipping semantic match");
                return SemanticMatch::None;
            }
            Err(_) => {
                warn!("Query embedding timed out, skipping semantic match");
                return SemanticMatch::None;
            }
        };

        let mut hits = self.search(&embedding, self.threshold).await;
        if hits.is_empty() && self.relaxed_threshold < self.threshold {
            debug!(
                threshold = self.relaxed_threshold,
                "No semantic hits, retrying at relaxed threshold"
            );
            hits = self.search(&embedding, self.relaxed_threshold).await;
        }

        match hits.len() {
            0 => SemanticMatch::None,
            1 => hits.pop().map_or(SemanticMatch::None, SemanticMatch::Single),
            _ => SemanticMatch::Multiple(hits),
        }
    }

    async fn search(&self, embedding: &[f32], min_score: f32) -> Vec<ScoredRecord> {
        let search = self.store.search_similar(embedding, min_score, self.limit);
        match tokio::time::timeout(self.store_timeout, search).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!(error = %e, "Semantic search failed");
                Vec::new()
            }
            Err(_) => {
                warn!("Semantic search timed out");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::{sample_recipe, MockEmbedder};
    use crate::traits::store::NewCacheRecord;
    use crate::types::input::InputKind;

    async fn seed(store: &MemoryStore, title: &str, embedding: Vec<f32>) {
        let record = store
            .insert(NewCacheRecord::new(
                format!("text:{}", title),
                InputKind::Text,
                sample_recipe(title),
            ))
            .await
            .unwrap();
        store.set_embedding(record.id, &embedding).await.unwrap();
    }

    #[tokio::test]
    async fn test_single_match() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "Chicken Curry", vec![1.0, 0.0, 0.0]).await;
        seed(&store, "Beef Stew", vec![0.0, 1.0, 0.0]).await;

        let embedder =
            Arc::new(MockEmbedder::new().with_embedding("chicken curry", vec![0.99, 0.05, 0.0]));
        let matcher = SemanticMatcher::new(embedder, store, &PipelineConfig::default());

        match matcher.find("chicken curry").await {
            SemanticMatch::Single(hit) => assert_eq!(hit.record.recipe.title, "Chicken Curry"),
            other => panic!("expected single match, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_relaxed_threshold_retry() {
        let store = Arc::new(MemoryStore::new());
        // cos = 0.8: misses 0.85, hits 0.75
        seed(&store, "Chicken Soup", vec![0.8, 0.6, 0.0]).await;

        let embedder = Arc::new(MockEmbedder::new().with_embedding("chicken", vec![1.0, 0.0, 0.0]));
        let matcher = SemanticMatcher::new(embedder, store, &PipelineConfig::default());

        assert!(matches!(matcher.find("chicken").await, SemanticMatch::Single(_)));
    }

    #[tokio::test]
    async fn test_multiple_candidates() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "Chicken Curry", vec![0.95, 0.1, 0.0]).await;
        seed(&store, "Chicken Tikka", vec![0.9, 0.2, 0.0]).await;
        seed(&store, "Fruit Salad", vec![0.0, 0.0, 1.0]).await;

        let embedder = Arc::new(MockEmbedder::new().with_embedding("chicken", vec![1.0, 0.0, 0.0]));
        let matcher = SemanticMatcher::new(embedder, store, &PipelineConfig::default());

        let found = matcher.find("chicken").await;
        let candidates = found.candidates();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Chicken Curry");
        assert!(candidates[0].similarity >= candidates[1].similarity);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_no_match() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "Chicken Curry", vec![1.0, 0.0, 0.0]).await;

        let matcher = SemanticMatcher::new(
            Arc::new(MockEmbedder::new().failing()),
            store,
            &PipelineConfig::default(),
        );
        assert!(matches!(matcher.find("chicken").await, SemanticMatch::None));
    }
}
