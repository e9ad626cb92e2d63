//! Cross-encoder re-ranking for two-stage retrieval.
//!
//! The first stage (nearest-neighbor search) narrows the store down to a few
//! candidates; a reranker then scores each candidate together with the query.


use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use tracing::{debug, info};

use crate::embeddings::onnx::normalize_model_name;
use crate::{RagError, Result};

pub const DEFAULT_RERANK_MODEL: &str = "BAAI/bge-reranker-base";

/// Scores (query, document) pairs; higher means more relevant.
pub trait Reranker: Send {
    /// Name of the scoring model
    fn model_name(&self) -> &str;

    /// Score every document against the query, returned in input order
    fn score(&mut self, query: &str, documents: &[&str]) -> Result<Vec<f32>>;
}

/// Reranker backed by a fastembed cross-encoder model
pub struct CrossEncoderReranker {
    model: TextRerank,
    model_name: String,
}

impl CrossEncoderReranker {
    /// Load a cross-encoder by name. Downloads the model on first use.
    #[inline]
    pub fn new(model_name: &str) -> Result<Self> {
        let model = resolve_reranker_model(model_name)?;
        let options = RerankInitOptions::new(model).with_show_download_progress(false);
        let model = TextRerank::try_new(options).map_err(|e| {
            RagError::Reranking(format!("Failed to load model '{}': {}", model_name, e))
        })?;

        info!("Loaded reranker model {}", model_name);
        Ok(Self {
            model,
            model_name: model_name.to_string(),
        })
    }
}

impl Reranker for CrossEncoderReranker {
    #[inline]
    fn model_name(&self) -> &str {
        &self.model_name
    }

    #[inline]
    fn score(&mut self, query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Reranking {} candidates", documents.len());
        let results = self
            .model
            .rerank(query, documents, false, None)
            .map_err(|e| RagError::Reranking(e.to_string()))?;

        // fastembed returns results sorted by score; put them back in input order
        let mut scores = vec![f32::NEG_INFINITY; documents.len()];
        for result in results {
            if let Some(slot) = scores.get_mut(result.index) {
                *slot = result.score;
            }
        }
        Ok(scores)
    }
}

/// Build the configured reranker, if any
#[inline]
pub fn build_reranker(model_name: Option<&str>) -> Result<Option<Box<dyn Reranker>>> {
    match model_name {
        Some(name) => Ok(Some(Box::new(CrossEncoderReranker::new(name)?))),
        None => Ok(None),
    }
}

fn resolve_reranker_model(name: &str) -> Result<RerankerModel> {
    let wanted = normalize_model_name(name);
    let supported = TextRerank::list_supported_models();

    supported
        .iter()
        .find(|info| {
            info.model_code.eq_ignore_ascii_case(name.trim())
                || normalize_model_name(&info.model_code) == wanted
        })
        .map(|info| info.model.clone())
        .ok_or_else(|| {
            RagError::Config(format!(
                "Unknown rerank model '{}'. Supported models: {}",
                name,
                supported
                    .iter()
                    .map(|info| info.model_code.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}
