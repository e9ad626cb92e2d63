//! Vector store: chunking, embedding, indexing and retrieval.
//!
//! A [`VectorStore`] keeps two structures in lockstep: a [`FlatIndex`] of
//! embedding vectors and a [`MetadataLog`] of chunk records. The record at
//! offset `i` describes the vector at offset `i`, and both files are rewritten
//! after every ingestion.


pub mod consistency;
pub mod index;
pub mod metadata;

pub use consistency::{ConsistencyReport, check_consistency};
pub use index::{FlatIndex, IndexHeader};
pub use metadata::{ChunkRecord, MetadataLog, UNKNOWN_SOURCE};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::embeddings::{ChunkingConfig, Embedder, chunk_text};
use crate::rerank::Reranker;
use crate::{RagError, Result};

pub const INDEX_FILE: &str = "vectors.index";
pub const METADATA_FILE: &str = "metadata.json";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const PROBE_TEXT: &str = "test";

/// Where the store lives and how it splits documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub index_dir: PathBuf,
    pub chunking: ChunkingConfig,
}

impl StoreConfig {
    #[inline]
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            chunking: ChunkingConfig::default(),
        }
    }

    #[inline]
    pub fn index_path(&self) -> PathBuf {
        index_path(&self.index_dir)
    }

    #[inline]
    pub fn metadata_path(&self) -> PathBuf {
        metadata_path(&self.index_dir)
    }
}

#[inline]
pub fn index_path(index_dir: &Path) -> PathBuf {
    index_dir.join(INDEX_FILE)
}

#[inline]
pub fn metadata_path(index_dir: &Path) -> PathBuf {
    index_dir.join(METADATA_FILE)
}

/// Outcome of a single ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_added: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_documents: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestReport {
    #[inline]
    pub fn success(chunks_added: usize, total_documents: usize) -> Self {
        Self {
            success: true,
            chunks_added: Some(chunks_added),
            total_documents: Some(total_documents),
            error: None,
        }
    }

    #[inline]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            chunks_added: None,
            total_documents: None,
            error: Some(error.into()),
        }
    }
}

/// A retrieved chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub text: String,
    pub source: String,
    /// Squared Euclidean distance to the query vector
    pub distance: f32,
    /// Cross-encoder relevance, present only when a reranker is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

pub struct VectorStore {
    config: StoreConfig,
    embedder: Box<dyn Embedder>,
    reranker: Option<Box<dyn Reranker>>,
    index: FlatIndex,
    metadata: MetadataLog,
}

impl VectorStore {
    /// Open (or create) the store in `config.index_dir`.
    ///
    /// The embedding width is measured by encoding a probe text. A persisted
    /// index of a different width is refused with [`RagError::DimensionMismatch`].
    #[inline]
    pub fn open(
        config: StoreConfig,
        mut embedder: Box<dyn Embedder>,
        reranker: Option<Box<dyn Reranker>>,
    ) -> Result<Self> {
        fs::create_dir_all(&config.index_dir)?;

        let dimension = embedder
            .encode(&[PROBE_TEXT.to_string()])?
            .first()
            .map(Vec::len)
            .filter(|len| *len > 0)
            .ok_or_else(|| {
                RagError::Embedding(format!(
                    "Model '{}' returned no vector for a probe text",
                    embedder.model_name()
                ))
            })?;
        debug!(
            "Embedding model {} produces {}-dimensional vectors",
            embedder.model_name(),
            dimension
        );

        let index = FlatIndex::load(&config.index_path(), dimension)?;
        let metadata = MetadataLog::load(&config.metadata_path(), embedder.model_name())?;

        if metadata.model != embedder.model_name() {
            warn!(
                "Metadata was created with model '{}' but '{}' is configured",
                metadata.model,
                embedder.model_name()
            );
        }

        let report = check_consistency(index.len(), &metadata);
        if !report.is_consistent {
            report.log_issues();
        }

        info!(
            "Opened vector store at {} with {} chunks",
            config.index_dir.display(),
            index.len()
        );

        Ok(Self {
            config,
            embedder,
            reranker,
            index,
            metadata,
        })
    }

    /// Chunk, embed and persist a document.
    ///
    /// A document without any words is reported as a failed ingestion and
    /// leaves the store untouched.
    #[inline]
    pub fn ingest(&mut self, document: &str, source: &str) -> Result<IngestReport> {
        let chunks = chunk_text(document, &self.config.chunking);
        if chunks.is_empty() {
            return Ok(IngestReport::failure("No chunks created from document"));
        }

        let vectors = self.embedder.encode(&chunks)?;
        self.check_vectors(&vectors, chunks.len())?;

        let index_len = self.index.len();
        let metadata_len = self.metadata.len();
        let added = chunks.len();

        self.index.add(&vectors)?;
        let indexed_at = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.metadata.append(chunks, source, &indexed_at);

        if let Err(e) = self.persist() {
            error!("Failed to persist vector store: {}", e);
            self.index.truncate(index_len);
            self.metadata.truncate(metadata_len);
            return Err(e);
        }

        info!(
            "Ingested {} chunks from '{}' ({} total)",
            added,
            source,
            self.metadata.len()
        );
        Ok(IngestReport::success(added, self.metadata.len()))
    }

    /// Retrieve the `top_k` chunks closest to `text`.
    ///
    /// With a reranker, every retrieved candidate is scored against the query
    /// and the results are ordered by that score instead of by distance.
    #[inline]
    pub fn query(&mut self, text: &str, top_k: usize) -> Result<Vec<QueryResult>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let k = top_k.min(self.index.len());
        let vectors = self.embedder.encode(&[text.to_string()])?;
        self.check_vectors(&vectors, 1)?;
        let Some(query_vector) = vectors.first() else {
            return Ok(Vec::new());
        };

        let neighbors = self.index.search(query_vector, k)?;
        let mut results: Vec<QueryResult> = neighbors
            .into_iter()
            .filter_map(|(offset, distance)| {
                let Some(record) = self.metadata.get(offset) else {
                    warn!("Index offset {} has no metadata record, skipping", offset);
                    return None;
                };
                Some(QueryResult {
                    text: record.text.clone(),
                    source: record.source.clone(),
                    distance,
                    rerank_score: None,
                })
            })
            .collect();

        if let Some(reranker) = self.reranker.as_mut() {
            rerank_results(reranker.as_mut(), text, &mut results)?;
        }

        debug!("Query returned {} results", results.len());
        Ok(results)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    #[inline]
    pub fn documents(&self) -> &[ChunkRecord] {
        &self.metadata.documents
    }

    #[inline]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        self.embedder.model_name()
    }

    #[inline]
    pub fn rerank_model(&self) -> Option<&str> {
        self.reranker.as_ref().map(|r| r.model_name())
    }

    #[inline]
    pub fn consistency(&self) -> ConsistencyReport {
        check_consistency(self.index.len(), &self.metadata)
    }

    fn check_vectors(&self, vectors: &[Vec<f32>], expected: usize) -> Result<()> {
        if vectors.len() != expected {
            return Err(RagError::Embedding(format!(
                "Expected {} embeddings but the model returned {}",
                expected,
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.index.dimension()) {
            return Err(RagError::Embedding(format!(
                "Model returned a {}-dimensional vector for a {}-dimensional index",
                bad.len(),
                self.index.dimension()
            )));
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        self.index.save(&self.config.index_path())?;
        self.metadata.save(&self.config.metadata_path())?;
        Ok(())
    }
}

fn rerank_results(
    reranker: &mut dyn Reranker,
    query: &str,
    results: &mut [QueryResult],
) -> Result<()> {
    if results.is_empty() {
        return Ok(());
    }

    let documents: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
    let scores = reranker.score(query, &documents)?;
    if scores.len() != results.len() {
        return Err(RagError::Reranking(format!(
            "Expected {} scores but the model returned {}",
            results.len(),
            scores.len()
        )));
    }

    for (result, score) in results.iter_mut().zip(scores) {
        result.rerank_score = Some(score);
    }
    results.sort_by(|a, b| {
        let a = a.rerank_score.unwrap_or(f32::NEG_INFINITY);
        let b = b.rerank_score.unwrap_or(f32::NEG_INFINITY);
        b.total_cmp(&a)
    });
    Ok(())
}
