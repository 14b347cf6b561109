//! SQLite recipe store.
//!
//! One `recipe_cache` table. Recipes are stored as JSON text, embeddings as
//! little-endian f32 BLOBs. SQLite has no vector search, so similarity is
//! computed in Rust over every embedded row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{
    cosine_similarity, rank_scored, CacheRecord, NewCacheRecord, RecipeStore, ScoredRecord,
};
use crate::types::{input::InputKind, recipe::StructuredRecipe};

const SELECT_COLUMNS: &str =
    "SELECT id, cache_key, source_kind, parent_id, recipe_json, embedding, created_at, updated_at FROM recipe_cache";

fn backend(e: impl std::error::Error + Send + Sync + 'static) -> StoreError {
    StoreError::Backend(Box::new(e))
}

fn corrupt(message: String) -> StoreError {
    StoreError::Backend(message.into())
}

/// SQLite-based recipe store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and run migrations.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://./recipes.db?mode=rwc` - File, created if missing
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        // In-memory databases are per-connection
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(backend)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// In-memory store (for testing).
    pub async fn in_memory() -> StoreResult<Self> {
        Self::new("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS recipe_cache (
                id TEXT PRIMARY KEY,
                cache_key TEXT NOT NULL,
                source_kind TEXT NOT NULL,
                parent_id TEXT REFERENCES recipe_cache(id),
                recipe_json TEXT NOT NULL,
                embedding BLOB,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_recipe_cache_key ON recipe_cache(cache_key, created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: String,
    cache_key: String,
    source_kind: String,
    parent_id: Option<String>,
    recipe_json: String,
    embedding: Option<Vec<u8>>,
    created_at: String,
    updated_at: String,
}

impl RecipeRow {
    fn into_record(self) -> StoreResult<CacheRecord> {
        let parse_id = |s: &str| {
            Uuid::parse_str(s).map_err(|e| corrupt(format!("Invalid id {}: {}", s, e)))
        };
        let parse_time = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| corrupt(format!("Invalid date: {}", e)))
        };

        Ok(CacheRecord {
            id: parse_id(&self.id)?,
            source_kind: InputKind::from_tag(&self.source_kind)
                .ok_or_else(|| corrupt(format!("Invalid source kind: {}", self.source_kind)))?,
            parent_id: self.parent_id.as_deref().map(parse_id).transpose()?,
            recipe: serde_json::from_str(&self.recipe_json)?,
            embedding: self.embedding.as_deref().map(decode_embedding),
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
            cache_key: self.cache_key,
        })
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[async_trait]
impl RecipeStore for SqliteStore {
    async fn get_by_key(&self, cache_key: &str) -> StoreResult<Option<CacheRecord>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "{} WHERE cache_key = ? ORDER BY created_at DESC, rowid DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(cache_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(RecipeRow::into_record).transpose()
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<CacheRecord>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(RecipeRow::into_record).transpose()
    }

    async fn insert(&self, record: NewCacheRecord) -> StoreResult<CacheRecord> {
        let record = record.into_record();
        let recipe_json = serde_json::to_string(&record.recipe)?;

        sqlx::query(
            r#"
            INSERT INTO recipe_cache
                (id, cache_key, source_kind, parent_id, recipe_json, embedding, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.cache_key)
        .bind(record.source_kind.as_str())
        .bind(record.parent_id.map(|p| p.to_string()))
        .bind(&recipe_json)
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(record)
    }

    async fn update_recipe(&self, id: Uuid, recipe: &StructuredRecipe) -> StoreResult<()> {
        let recipe_json = serde_json::to_string(recipe)?;
        let result = sqlx::query(
            "UPDATE recipe_cache SET recipe_json = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&recipe_json)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_embedding(&self, id: Uuid, embedding: &[f32]) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE recipe_cache SET embedding = ?, updated_at = ? WHERE id = ?",
        )
        .bind(encode_embedding(embedding))
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn search_similar(
        &self,
        embedding: &[f32],
        min_score: f32,
        limit: usize,
    ) -> StoreResult<Vec<ScoredRecord>> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "{} WHERE embedding IS NOT NULL",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut scored = Vec::new();
        for row in rows {
            let record = row.into_record()?;
            let score = record
                .embedding
                .as_deref()
                .map_or(0.0, |e| cosine_similarity(embedding, e));
            if score >= min_score {
                scored.push(ScoredRecord { record, score });
            }
        }
        Ok(rank_scored(scored, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_recipe;

    async fn test_store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = test_store().await;
        let inserted = store
            .insert(NewCacheRecord::new(
                "https://example.com/pasta",
                InputKind::Url,
                sample_recipe("Pasta"),
            ))
            .await
            .unwrap();

        let by_key = store
            .get_by_key("https://example.com/pasta")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_key.id, inserted.id);
        assert_eq!(by_key.source_kind, InputKind::Url);
        assert_eq!(by_key.recipe, sample_recipe("Pasta"));

        let by_id = store.get_by_id(inserted.id).await.unwrap().unwrap();
        assert_eq!(by_id.cache_key, "https://example.com/pasta");
    }

    #[tokio::test]
    async fn test_newest_wins() {
        let store = test_store().await;
        let first = store
            .insert(NewCacheRecord::new("k", InputKind::Text, sample_recipe("First")))
            .await
            .unwrap();
        store
            .insert(
                NewCacheRecord::new("k", InputKind::Text, sample_recipe("Second"))
                    .with_parent(first.id),
            )
            .await
            .unwrap();

        let found = store.get_by_key("k").await.unwrap().unwrap();
        assert_eq!(found.recipe.title, "Second");
        assert_eq!(found.parent_id, Some(first.id));
    }

    #[tokio::test]
    async fn test_update_and_embedding() {
        let store = test_store().await;
        let record = store
            .insert(NewCacheRecord::new("k", InputKind::Text, sample_recipe("Soup")))
            .await
            .unwrap();

        let mut recipe = record.recipe.clone();
        recipe.id = Some(record.id.to_string());
        store.update_recipe(record.id, &recipe).await.unwrap();
        store
            .set_embedding(record.id, &[0.1, 0.2, 0.3, 0.4])
            .await
            .unwrap();

        let found = store.get_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found.recipe.id, Some(record.id.to_string()));
        let embedding = found.embedding.unwrap();
        assert_eq!(embedding.len(), 4);
        assert!((embedding[0] - 0.1).abs() < 0.001);

        assert!(matches!(
            store.set_embedding(Uuid::new_v4(), &[1.0]).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_similarity_search() {
        let store = test_store().await;
        for i in 0..5 {
            let record = store
                .insert(NewCacheRecord::new(
                    format!("k{}", i),
                    InputKind::Text,
                    sample_recipe(&format!("Dish {}", i)),
                ))
                .await
                .unwrap();
            store
                .set_embedding(record.id, &[i as f32 * 0.1, 0.5, 0.5, 0.5])
                .await
                .unwrap();
        }

        let results = store
            .search_similar(&[0.4, 0.5, 0.5, 0.5], 0.0, 3)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].record.recipe.title, "Dish 4");
    }
}
