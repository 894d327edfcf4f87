//! PostgreSQL database connection and migrations

use crate::config::PostgresConfig;
use crate::error::{Error, Result};
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, warn};

/// PostgreSQL connection pool type alias
pub type PostgresPool = PgPool;

/// Initialize the PostgreSQL connection pool
///
/// With `require_pgvector` set, the pool is only returned when the `vector`
/// extension is installed.
pub async fn init_pool(config: &PostgresConfig, require_pgvector: bool) -> Result<PostgresPool> {
    info!("Initializing PostgreSQL connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(config.url.expose_secret())
        .await?;

    // Verify connection and optionally check for required extensions
    verify_database(&pool, require_pgvector).await?;

    info!("PostgreSQL connection pool initialized successfully");
    Ok(pool)
}

/// Verify database connection and optionally check for required extensions
async fn verify_database(pool: &PgPool, require_pgvector: bool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    if require_pgvector {
        let result: Option<(String,)> =
            sqlx::query_as("SELECT extname FROM pg_extension WHERE extname = 'vector'")
                .fetch_optional(pool)
                .await?;

        if result.is_none() {
            return Err(Error::Database(sqlx::Error::Configuration(
                "pgvector extension is not installed. Run: CREATE EXTENSION vector;".into(),
            )));
        }
    }

    Ok(())
}

/// Database migrations
pub mod migrations {
    use super::*;
    use crate::memory::EMBEDDING_DIMENSIONS;

    /// Table definition for `vector_documents` with a fixed embedding width
    pub(crate) fn vector_table_ddl(dimensions: usize) -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS vector_documents (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                collection TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{{}}',
                embedding vector({}) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#,
            dimensions
        )
    }

    /// Create the episodic memory table with its full-text search trigger
    pub async fn run_memory(pool: &PgPool) -> Result<()> {
        info!("Running memory store migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                search_vector TSVECTOR
            )
        "#,
        )
        .execute(pool)
        .await?;

        // Each index must be a separate query for SQLx
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_memories_user_id ON memories(user_id)")
            .execute(pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_memories_metadata ON memories USING GIN(metadata)")
            .execute(pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_memories_search_vector ON memories USING GIN(search_vector)",
        )
        .execute(pool)
        .await?;

        // 'simple' config keeps tokens language-neutral
        sqlx::query(
            r#"
            CREATE OR REPLACE FUNCTION memories_search_vector_update() RETURNS trigger AS $$
            BEGIN
              NEW.search_vector := to_tsvector('simple', COALESCE(NEW.content, ''));
              RETURN NEW;
            END;
            $$ LANGUAGE plpgsql
        "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("DROP TRIGGER IF EXISTS memories_search_vector_trigger ON memories")
            .execute(pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TRIGGER memories_search_vector_trigger
              BEFORE INSERT OR UPDATE ON memories
              FOR EACH ROW EXECUTE FUNCTION memories_search_vector_update()
        "#,
        )
        .execute(pool)
        .await?;

        info!("Memory store migrations completed");
        Ok(())
    }

    /// Create the pgvector document table
    pub async fn run_vector(pool: &PgPool) -> Result<()> {
        info!("Running vector index migrations");

        // Requires superuser or the extension already being available
        match sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(pool)
            .await
        {
            Ok(_) => info!("pgvector extension enabled"),
            Err(e) => {
                warn!("Could not create pgvector extension: {}", e);
                warn!("If you need vector support, run as superuser: CREATE EXTENSION vector;");
            }
        }

        sqlx::query(&vector_table_ddl(EMBEDDING_DIMENSIONS))
            .execute(pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_vector_documents_collection ON vector_documents(collection)",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_vector_documents_embedding ON vector_documents
            USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100)
        "#,
        )
        .execute(pool)
        .await
        .ok(); // Ignore if not enough data or vector type not available

        info!("Vector index migrations completed");
        Ok(())
    }
}
