//! In-memory recipe store for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{
    cosine_similarity, rank_scored, CacheRecord, NewCacheRecord, RecipeStore, ScoredRecord,
};
use crate::types::recipe::StructuredRecipe;

/// In-memory storage for cache records.
///
/// Not suitable for production: data is lost on restart.
pub struct MemoryStore {
    /// Records in insertion order
    records: RwLock<Vec<CacheRecord>>,
    /// id → index into `records`
    by_id: RwLock<HashMap<Uuid, usize>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            by_id: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Number of records with an embedding attached.
    pub fn embedding_count(&self) -> usize {
        self.records
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.embedding.is_some())
            .count()
    }

    /// All records for a key, oldest first.
    pub fn records_for_key(&self, cache_key: &str) -> Vec<CacheRecord> {
        self.records
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.cache_key == cache_key)
            .cloned()
            .collect()
    }

    fn with_record<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut CacheRecord) -> T,
    ) -> StoreResult<T> {
        let idx = *self
            .by_id
            .read()
            .unwrap()
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(idx)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(f(record))
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn get_by_key(&self, cache_key: &str) -> StoreResult<Option<CacheRecord>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.cache_key == cache_key)
            .cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<CacheRecord>> {
        let idx = self.by_id.read().unwrap().get(&id).copied();
        Ok(idx.and_then(|i| self.records.read().unwrap().get(i).cloned()))
    }

    async fn insert(&self, record: NewCacheRecord) -> StoreResult<CacheRecord> {
        let record = record.into_record();
        let mut records = self.records.write().unwrap();
        self.by_id
            .write()
            .unwrap()
            .insert(record.id, records.len());
        records.push(record.clone());
        Ok(record)
    }

    async fn update_recipe(&self, id: Uuid, recipe: &StructuredRecipe) -> StoreResult<()> {
        self.with_record(id, |record| {
            record.recipe = recipe.clone();
            record.updated_at = Utc::now();
        })
    }

    async fn set_embedding(&self, id: Uuid, embedding: &[f32]) -> StoreResult<()> {
        self.with_record(id, |record| {
            record.embedding = Some(embedding.to_vec());
            record.updated_at = Utc::now();
        })
    }

    async fn search_similar(
        &self,
        embedding: &[f32],
        min_score: f32,
        limit: usize,
    ) -> StoreResult<Vec<ScoredRecord>> {
        let scored = self
            .records
            .read()
            .unwrap()
            .iter()
            .filter_map(|r| {
                let score = cosine_similarity(embedding, r.embedding.as_deref()?);
                (score >= min_score).then(|| ScoredRecord {
                    record: r.clone(),
                    score,
                })
            })
            .collect();
        Ok(rank_scored(scored, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_recipe;
    use crate::types::input::InputKind;

    fn new_record(key: &str, title: &str) -> NewCacheRecord {
        NewCacheRecord::new(key, InputKind::Url, sample_recipe(title))
    }

    #[tokio::test]
    async fn test_get_by_key_returns_newest() {
        let store = MemoryStore::new();
        store.insert(new_record("k", "Old")).await.unwrap();
        let newer = store.insert(new_record("k", "New")).await.unwrap();

        let found = store.get_by_key("k").await.unwrap().unwrap();
        assert_eq!(found.id, newer.id);
        assert_eq!(found.recipe.title, "New");
        assert_eq!(store.records_for_key("k").len(), 2);
        assert!(store.get_by_key("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_id_backfill() {
        let store = MemoryStore::new();
        let record = store.insert(new_record("k", "Pie")).await.unwrap();

        let mut recipe = record.recipe.clone();
        recipe.id = Some(record.id.to_string());
        store.update_recipe(record.id, &recipe).await.unwrap();

        let found = store.get_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found.recipe.id, Some(record.id.to_string()));
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let store = MemoryStore::new();
        let err = store.set_embedding(Uuid::new_v4(), &[1.0]).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_similarity_search() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let record = store
                .insert(new_record(&format!("k{}", i), &format!("Dish {}", i)))
                .await
                .unwrap();
            store
                .set_embedding(record.id, &[i as f32 * 0.1, 0.5, 0.5, 0.5])
                .await
                .unwrap();
        }
        // A record without embedding is never returned
        store.insert(new_record("bare", "Bare")).await.unwrap();

        let results = store
            .search_similar(&[0.4, 0.5, 0.5, 0.5], 0.0, 3)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].record.recipe.title, "Dish 4");
        assert_eq!(store.embedding_count(), 5);
    }
}
