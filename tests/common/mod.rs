#![allow(dead_code, reason = "each integration test binary uses a subset of the helpers")]

use local_rag_mcp::Result;
use local_rag_mcp::embeddings::{ChunkingConfig, Embedder};
use local_rag_mcp::rerank::Reranker;
use local_rag_mcp::store::{StoreConfig, VectorStore};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hashes each lowercased word into one of `dimension` buckets
pub struct HashEmbedder {
    pub dimension: usize,
    pub calls: Arc<AtomicUsize>,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }

    fn encode(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0; self.dimension];
                for word in text.split_whitespace() {
                    let bucket = (fnv1a(&word.to_lowercase()) % self.dimension as u64) as usize;
                    vector[bucket] += 1.0;
                }
                vector
            })
            .collect())
    }
}

/// Returns fixed vectors for known texts and the origin for anything else
pub struct TableEmbedder {
    pub table: HashMap<String, Vec<f32>>,
    pub dimension: usize,
}

impl TableEmbedder {
    pub fn new(entries: &[(&str, &[f32])]) -> Self {
        let dimension = entries.first().map_or(2, |(_, v)| v.len());
        Self {
            table: entries
                .iter()
                .map(|(text, vector)| ((*text).to_string(), vector.to_vec()))
                .collect(),
            dimension,
        }
    }
}

impl Embedder for TableEmbedder {
    fn model_name(&self) -> &str {
        "table"
    }

    fn encode(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                self.table
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| vec![0.0; self.dimension])
            })
            .collect())
    }
}

/// Scores documents containing the keyword above everything else
pub struct KeywordReranker {
    pub keyword: String,
}

impl Reranker for KeywordReranker {
    fn model_name(&self) -> &str {
        "keyword"
    }

    fn score(&mut self, _query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        Ok(documents
            .iter()
            .map(|d| if d.contains(&self.keyword) { 1.0 } else { 0.0 })
            .collect())
    }
}

pub fn store_config(dir: &Path, chunk_size: usize, overlap: usize) -> StoreConfig {
    StoreConfig {
        index_dir: dir.to_path_buf(),
        chunking: ChunkingConfig {
            chunk_size,
            overlap,
        },
    }
}

pub fn open_hash_store(dir: &Path, dimension: usize) -> VectorStore {
    VectorStore::open(
        StoreConfig::new(dir),
        Box::new(HashEmbedder::new(dimension)),
        None,
    )
    .expect("store should open")
}
