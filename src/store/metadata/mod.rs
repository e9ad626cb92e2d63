
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{RagError, Result};

/// Source name recorded when a caller or a persisted record gives none
pub const UNKNOWN_SOURCE: &str = "unknown";

/// One chunk of ingested text, aligned by position with the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Offset of this record in the log and of its vector in the index
    #[serde(rename = "id")]
    pub positional_id: usize,
    #[serde(default = "unknown_source")]
    pub source: String,
    pub text: String,
    /// Local ingestion time, `YYYY-MM-DDTHH:MM:SS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
}

fn unknown_source() -> String {
    UNKNOWN_SOURCE.to_string()
}

/// Append-only, ordered log of chunk records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataLog {
    pub documents: Vec<ChunkRecord>,
    /// Embedding model that produced the matching vectors
    #[serde(default)]
    pub model: String,
}

impl MetadataLog {
    #[inline]
    pub fn new(model: &str) -> Self {
        Self {
            documents: Vec::new(),
            model: model.to_string(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[inline]
    pub fn get(&self, offset: usize) -> Option<&ChunkRecord> {
        self.documents.get(offset)
    }

    /// Append chunk texts from one source, continuing the id sequence
    #[inline]
    pub fn append<I>(&mut self, texts: I, source: &str, indexed_at: &str)
    where
        I: IntoIterator<Item = String>,
    {
        let start = self.documents.len();
        self.documents
            .extend(texts.into_iter().enumerate().map(|(i, text)| ChunkRecord {
                positional_id: start + i,
                source: source.to_string(),
                text,
                indexed_at: Some(indexed_at.to_string()),
            }));
    }

    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.documents.truncate(len);
    }

    /// Read a metadata file strictly: a missing file is an error.
    #[inline]
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RagError::MalformedMetadata {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    /// Load a metadata file. A missing or empty file is a fresh, empty log.
    #[inline]
    pub fn load(path: &Path, model: &str) -> Result<Self> {
        if !path.exists() {
            debug!("No metadata at {}, starting empty", path.display());
            return Ok(Self::new(model));
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::new(model));
        }

        let mut log = Self::parse(&content, path)?;
        if log.model.is_empty() {
            log.model = model.to_string();
        }
        debug!(
            "Loaded {} chunk records from {}",
            log.documents.len(),
            path.display()
        );
        Ok(log)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| RagError::MalformedMetadata {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write the log as pretty JSON, replacing any previous file atomically
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RagError::Other(anyhow::anyhow!("Failed to serialize metadata: {}", e)))?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, path)?;

        debug!(
            "Saved {} chunk records to {}",
            self.documents.len(),
            path.display()
        );
        Ok(())
    }
}
