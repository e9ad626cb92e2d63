#[cfg(test)]
mod tests;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::debug;

use crate::embeddings::Embedder;
use crate::{RagError, Result};

/// Local ONNX sentence-embedding model run through fastembed
pub struct FastEmbedder {
    model: TextEmbedding,
    model_name: String,
    batch_size: usize,
}

impl FastEmbedder {
    /// Load a model by name, downloading it on first use.
    ///
    /// Accepts either the full model code (`Qdrant/all-MiniLM-L6-v2-onnx`) or the
    /// familiar sentence-transformers name (`all-MiniLM-L6-v2`).
    #[inline]
    pub fn new(model_name: &str, batch_size: usize) -> Result<Self> {
        let model = resolve_embedding_model(model_name)?;
        let options = InitOptions::new(model).with_show_download_progress(false);
        let model = TextEmbedding::try_new(options).map_err(|e| {
            RagError::Embedding(format!("Failed to load model '{}': {}", model_name, e))
        })?;

        Ok(Self {
            model,
            model_name: model_name.to_string(),
            batch_size: batch_size.max(1),
        })
    }
}

impl Embedder for FastEmbedder {
    #[inline]
    fn model_name(&self) -> &str {
        &self.model_name
    }

    #[inline]
    fn encode(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Encoding {} texts with {}", texts.len(), self.model_name);
        self.model
            .embed(texts, Some(self.batch_size))
            .map_err(|e| RagError::Embedding(e.to_string()))
    }
}

/// Reduce a model identifier to a comparable key: last path segment, lowercase,
/// without an `-onnx` suffix.
#[inline]
pub fn normalize_model_name(name: &str) -> String {
    let last = name.trim().rsplit('/').next().unwrap_or_default();
    let lower = last.to_ascii_lowercase();
    lower.strip_suffix("-onnx").unwrap_or(&lower).to_string()
}

fn resolve_embedding_model(name: &str) -> Result<EmbeddingModel> {
    let wanted = normalize_model_name(name);
    let supported = TextEmbedding::list_supported_models();

    supported
        .iter()
        .find(|info| info.model_code.eq_ignore_ascii_case(name.trim()))
        .or_else(|| {
            supported
                .iter()
                .find(|info| normalize_model_name(&info.model_code) == wanted)
        })
        .map(|info| info.model.clone())
        .ok_or_else(|| {
            RagError::Config(format!(
                "Unknown embedding model '{}'. Supported models include: {}",
                name,
                supported
                    .iter()
                    .take(8)
                    .map(|info| info.model_code.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}
