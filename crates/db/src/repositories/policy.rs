use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use wayfare_core::domain::policy::{PassageId, PolicyPassage};

use super::{PolicyPassageRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPolicyPassageRepository {
    pool: DbPool,
}

impl SqlPolicyPassageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_passage(row: &sqlx::sqlite::SqliteRow) -> Result<PolicyPassage, RepositoryError> {
    let id: String = row.try_get("id")?;
    let collection: String = row.try_get("collection")?;
    let content: String = row.try_get("content")?;
    let embedding_json: String = row.try_get("embedding_json")?;
    let embedding: Vec<f32> = serde_json::from_str(&embedding_json)
        .map_err(|e| RepositoryError::Decode(format!("passage {id} embedding: {e}")))?;

    Ok(PolicyPassage { id: PassageId(id), collection, content, embedding })
}

#[async_trait]
impl PolicyPassageRepository for SqlPolicyPassageRepository {
    async fn replace_collection(
        &self,
        collection: &str,
        passages: Vec<PolicyPassage>,
    ) -> Result<usize, RepositoryError> {
        let created_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM policy_passages WHERE collection = ?")
            .bind(collection)
            .execute(&mut *tx)
            .await?;

        for passage in &passages {
            let embedding_json = serde_json::to_string(&passage.embedding)
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
            sqlx::query(
                "INSERT INTO policy_passages (id, collection, content, embedding_json, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&passage.id.0)
            .bind(collection)
            .bind(&passage.content)
            .bind(embedding_json)
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(passages.len())
    }

    async fn list_collection(&self, collection: &str) -> Result<Vec<PolicyPassage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, collection, content, embedding_json
             FROM policy_passages WHERE collection = ? ORDER BY id ASC",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_passage).collect()
    }

    async fn count_collection(&self, collection: &str) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM policy_passages WHERE collection = ?")
                .bind(collection)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as u64)
    }
}
