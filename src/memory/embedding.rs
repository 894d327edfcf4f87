//! Local embedding generation via fastembed
//!
//! The model (~90MB) auto-downloads on first use. Loading is deferred until
//! the first embedding request and guarded by a `OnceCell`, so concurrent
//! first queries share a single initialization.

use crate::config::EmbeddingConfig;
use crate::core::Embedder;
use crate::error::{Error, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Embedding dimensions shared by every supported model
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Map a configured model name onto a fastembed model
pub fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    match name.to_lowercase().as_str() {
        "multilingual-e5-small" | "intfloat/multilingual-e5-small" => {
            Ok(EmbeddingModel::MultilingualE5Small)
        }
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(Error::Config(format!("Unsupported embedding model: {}", other))),
    }
}

/// Local embedding service wrapping fastembed
#[derive(Clone)]
pub struct EmbeddingService {
    model_name: String,
    model: EmbeddingModel,
    show_download_progress: bool,
    handle: Arc<OnceCell<Arc<TextEmbedding>>>,
}

impl EmbeddingService {
    /// Create a service for the configured model. The model itself is loaded
    /// on first use.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(EmbeddingService {
            model_name: config.model.clone(),
            model: resolve_model(&config.model)?,
            show_download_progress: config.show_download_progress,
            handle: Arc::new(OnceCell::new()),
        })
    }

    /// Whether the model has been loaded
    pub fn is_loaded(&self) -> bool {
        self.handle.initialized()
    }

    async fn model(&self) -> Result<Arc<TextEmbedding>> {
        let model = self
            .handle
            .get_or_try_init(|| async {
                let options = InitOptions::new(self.model.clone())
                    .with_show_download_progress(self.show_download_progress);
                let name = self.model_name.clone();

                let model = tokio::task::spawn_blocking(move || TextEmbedding::try_new(options))
                    .await
                    .map_err(|e| Error::Embedding(format!("Model init task join error: {}", e)))?
                    .map_err(|e| Error::Embedding(format!("Failed to init embedding model: {}", e)))?;

                info!("Embedding model {} loaded", name);
                Ok::<_, Error>(Arc::new(model))
            })
            .await?;

        Ok(model.clone())
    }
}

#[async_trait]
impl Embedder for EmbeddingService {
    fn id(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.model().await?;
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let embeddings = model
                .embed(vec![text], None)
                .map_err(|e| Error::Embedding(format!("Embedding error: {}", e)))?;
            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| Error::Embedding("No embedding returned".into()))
        })
        .await
        .map_err(|e| Error::Embedding(format!("Embedding task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model() {
        assert!(matches!(
            resolve_model("multilingual-e5-small"),
            Ok(EmbeddingModel::MultilingualE5Small)
        ));
        assert!(matches!(
            resolve_model("All-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(resolve_model("word2vec"), Err(Error::Config(_))));
    }

    #[test]
    fn test_service_is_lazy() {
        // Construction must not download or load the model
        let service = EmbeddingService::new(&EmbeddingConfig::default()).unwrap();
        assert!(!service.is_loaded());
        assert_eq!(service.id(), "multilingual-e5-small");
    }
}
