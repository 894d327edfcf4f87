//! Vector index backed by PostgreSQL + pgvector

use crate::core::{Metadata, VectorBackend, VectorRecord};
use crate::database::PostgresPool;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// pgvector-backed index scoped to one collection.
///
/// Distances are pgvector cosine distances (`<=>`), 0..2.
#[derive(Clone)]
pub struct PgVectorIndex {
    pg_pool: PostgresPool,
    collection: String,
}

impl PgVectorIndex {
    /// Create an index over `collection`
    pub fn new(pg_pool: PostgresPool, collection: impl Into<String>) -> Self {
        PgVectorIndex {
            pg_pool,
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl VectorBackend for PgVectorIndex {
    fn id(&self) -> &str {
        "pgvector"
    }

    async fn add(&self, text: &str, embedding: Vec<f32>, metadata: &Metadata) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO vector_documents (id, collection, content, metadata, embedding, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#,
        )
        .bind(Uuid::new_v4())
        .bind(&self.collection)
        .bind(text)
        .bind(Json(metadata))
        .bind(Vector::from(embedding))
        .bind(Utc::now())
        .execute(&self.pg_pool)
        .await?;

        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<VectorRecord>> {
        #[derive(FromRow)]
        struct DocumentWithDistance {
            content: String,
            metadata: Json<Metadata>,
            created_at: DateTime<Utc>,
            distance: f32,
        }

        let empty = Metadata::new();
        let rows: Vec<DocumentWithDistance> = sqlx::query_as(
            r#"
            SELECT content, metadata, created_at,
                   (embedding <=> $1)::REAL AS distance
            FROM vector_documents
            WHERE collection = $2 AND metadata @> $3
            ORDER BY embedding <=> $1
            LIMIT $4
        "#,
        )
        .bind(Vector::from(embedding.to_vec()))
        .bind(&self.collection)
        .bind(Json(filters.unwrap_or(&empty)))
        .bind(n_results as i64)
        .fetch_all(&self.pg_pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| VectorRecord {
                text: r.content,
                distance: r.distance,
                timestamp: Some(r.created_at),
                metadata: r.metadata.0,
            })
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(sqlx::query("SELECT 1").execute(&self.pg_pool).await.is_ok())
    }

    async fn close(&self) -> Result<()> {
        self.pg_pool.close().await;
        Ok(())
    }
}
