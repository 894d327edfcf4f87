//! Episodic memory storage backed by PostgreSQL full-text search

use crate::core::{MemoryBackend, MemoryRecord, Metadata};
use crate::database::PostgresPool;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::debug;
use uuid::Uuid;

/// Build an OR tsquery from the alphanumeric words of a query
fn build_tsquery(query: &str) -> Option<String> {
    let words: Vec<String> = query
        .split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" | "))
    }
}

/// Memory store backed by PostgreSQL tsvector search.
///
/// Scores are `ts_rank_cd` values, which are unbounded; the coordinator
/// rescales them per batch.
#[derive(Clone)]
pub struct PgMemoryStore {
    pg_pool: PostgresPool,
}

impl PgMemoryStore {
    /// Create a new memory store
    pub fn new(pg_pool: PostgresPool) -> Self {
        PgMemoryStore { pg_pool }
    }
}

#[async_trait]
impl MemoryBackend for PgMemoryStore {
    fn id(&self) -> &str {
        "postgres"
    }

    async fn add(&self, text: &str, user_id: &str, metadata: &Metadata) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO memories (id, user_id, content, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5)
        "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(text)
        .bind(Json(metadata))
        .bind(Utc::now())
        .execute(&self.pg_pool)
        .await?;

        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        user_id: &str,
        limit: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<MemoryRecord>> {
        let Some(tsquery) = build_tsquery(query) else {
            return Ok(vec![]);
        };

        #[derive(FromRow)]
        struct MemoryWithScore {
            content: String,
            metadata: Json<Metadata>,
            created_at: DateTime<Utc>,
            score: f32,
        }

        let empty = Metadata::new();
        let rows: Vec<MemoryWithScore> = sqlx::query_as(
            r#"
            SELECT content, metadata, created_at,
                   ts_rank_cd(search_vector, to_tsquery('simple', $2))::REAL AS score
            FROM memories
            WHERE user_id = $1
              AND search_vector @@ to_tsquery('simple', $2)
              AND metadata @> $3
            ORDER BY score DESC, created_at DESC
            LIMIT $4
        "#,
        )
        .bind(user_id)
        .bind(&tsquery)
        .bind(Json(filters.unwrap_or(&empty)))
        .bind(limit as i64)
        .fetch_all(&self.pg_pool)
        .await?;

        debug!("Memory full-text search returned {} rows", rows.len());

        Ok(rows
            .into_iter()
            .map(|r| MemoryRecord {
                text: r.content,
                score: r.score,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_tsquery() {
        assert_eq!(
            build_tsquery("when is the deadline?").as_deref(),
            Some("when | is | the | deadline")
        );
        assert_eq!(build_tsquery("budget $500").as_deref(), Some("budget | 500"));
    }

    #[test]
    fn test_build_tsquery_empty() {
        assert!(build_tsquery("").is_none());
        assert!(build_tsquery("  ?! & | ").is_none());
    }
}
