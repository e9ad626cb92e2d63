// Embeddings module
// Chunking policy plus the embedding providers behind a single trait

pub mod chunking;
pub mod ollama;
pub mod onnx;

pub use chunking::{ChunkingConfig, chunk_text};
pub use ollama::OllamaEmbedder;
pub use onnx::FastEmbedder;

use tracing::info;

use crate::Result;
use crate::config::{EmbeddingConfig, EmbeddingProvider};

/// Maps text to fixed-width dense vectors.
///
/// Implementations must be deterministic for a given model and return exactly
/// one vector per input, in input order.
pub trait Embedder: Send {
    /// Name of the model producing the vectors
    fn model_name(&self) -> &str;

    /// Encode a batch of texts
    fn encode(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Build the embedder selected by the configuration
#[inline]
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    info!(
        "Loading {:?} embedding model {}",
        config.provider, config.model
    );

    match config.provider {
        EmbeddingProvider::Fastembed => {
            let embedder = FastEmbedder::new(&config.model, config.batch_size as usize)?;
            Ok(Box::new(embedder))
        }
        EmbeddingProvider::Ollama => {
            let embedder = OllamaEmbedder::new(config)?;
            Ok(Box::new(embedder))
        }
    }
}
