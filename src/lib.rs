use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "Existing index dimension ({persisted}) does not match embedding model dimension ({configured}). \
         Please use a different index directory or the same embedding model."
    )]
    DimensionMismatch { persisted: usize, configured: usize },

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read metadata from {}: {message}", path.display())]
    MalformedMetadata { path: PathBuf, message: String },

    #[error("Index error: {0}")]
    Index(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Reranking error: {0}")]
    Reranking(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod mcp;
pub mod output;
pub mod rerank;
pub mod store;
