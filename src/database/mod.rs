//! Database module - PostgreSQL + pgvector
//!
//! Provides the PostgreSQL-backed collaborators:
//! - tsvector full-text search over episodic memories
//! - pgvector cosine-distance search over indexed documents

mod memory;
mod postgres;
mod vector;

pub use memory::PgMemoryStore;
pub use postgres::{init_pool, migrations, PostgresPool};
pub use vector::PgVectorIndex;
