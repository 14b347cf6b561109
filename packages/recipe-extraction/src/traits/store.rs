//! Cache store trait for accepted recipes.
//!
//! A record is written once, after validation accepts the recipe. The only
//! later mutations are the identifier backfill (part of the write path) and
//! the asynchronous embedding backfill.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::types::{input::InputKind, recipe::StructuredRecipe};

/// A persisted cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Store-assigned identifier
    pub id: Uuid,

    pub cache_key: String,

    /// Kind of input the recipe was produced from
    pub source_kind: InputKind,

    /// Record this one was derived from, if any
    pub parent_id: Option<Uuid>,

    pub recipe: StructuredRecipe,

    /// Embedding of title + description, filled in asynchronously
    pub embedding: Option<Vec<f32>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller when inserting a record.
#[derive(Debug, Clone)]
pub struct NewCacheRecord {
    pub cache_key: String,
    pub source_kind: InputKind,
    pub parent_id: Option<Uuid>,
    pub recipe: StructuredRecipe,
}

impl NewCacheRecord {
    pub fn new(
        cache_key: impl Into<String>,
        source_kind: InputKind,
        recipe: StructuredRecipe,
    ) -> Self {
        Self {
            cache_key: cache_key.into(),
            source_kind,
            parent_id: None,
            recipe,
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Materialize into a full record with a fresh id and timestamps.
    pub fn into_record(self) -> CacheRecord {
        let now = Utc::now();
        CacheRecord {
            id: Uuid::new_v4(),
            cache_key: self.cache_key,
            source_kind: self.source_kind,
            parent_id: self.parent_id,
            recipe: self.recipe,
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A record returned from similarity search.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: CacheRecord,

    /// Cosine similarity to the query embedding
    pub score: f32,
}

/// Persistence for accepted recipes.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Newest record for a cache key.
    async fn get_by_key(&self, cache_key: &str) -> StoreResult<Option<CacheRecord>>;

    /// Record by identifier.
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<CacheRecord>>;

    /// Insert a record. The store assigns the id and creation time.
    async fn insert(&self, record: NewCacheRecord) -> StoreResult<CacheRecord>;

    /// Replace the stored recipe (identifier backfill).
    async fn update_recipe(&self, id: Uuid, recipe: &StructuredRecipe) -> StoreResult<()>;

    /// Attach an embedding to a record.
    async fn set_embedding(&self, id: Uuid, embedding: &[f32]) -> StoreResult<()>;

    /// Records whose embedding scores at least `min_score` against `embedding`.
    ///
    /// Sorted by score, highest first.
    async fn search_similar(
        &self,
        embedding: &[f32],
        min_score: f32,
        limit: usize,
    ) -> StoreResult<Vec<ScoredRecord>>;
}

/// Rank scored records (highest first) and keep the top `limit`.
pub fn rank_scored(mut scored: Vec<ScoredRecord>, limit: usize) -> Vec<ScoredRecord> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(limit);
    scored
}

/// Cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(title: &str, score: f32) -> ScoredRecord {
        ScoredRecord {
            record: NewCacheRecord::new(
                format!("text:{}", title),
                InputKind::Text,
                StructuredRecipe::new(title),
            )
            .into_record(),
            score,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert!((cosine_similarity(&a, &[-1.0, 0.0, 0.0]) + 1.0).abs() < 0.001);
        // Mismatched dimensions never match
        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_scored() {
        let ranked = rank_scored(
            vec![scored("a", 0.8), scored("b", 0.95), scored("c", 0.9)],
            2,
        );
        let titles: Vec<_> = ranked.iter().map(|s| s.record.recipe.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c"]);
    }

    #[test]
    fn test_into_record_assigns_fresh_ids() {
        let new = NewCacheRecord::new("k", InputKind::Url, StructuredRecipe::new("Pie"));
        let a = new.clone().into_record();
        let b = new.into_record();
        assert_ne!(a.id, b.id);
        assert!(a.embedding.is_none());
    }
}
