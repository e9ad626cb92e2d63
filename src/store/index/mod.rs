#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::{RagError, Result};

const MAGIC: &[u8; 8] = b"LRAGIDX\0";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 4 + 8;

/// Summary of a persisted index, readable without loading the vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub dimension: usize,
    pub count: usize,
}

/// Exact nearest-neighbor index over fixed-width vectors.
///
/// Vectors are stored contiguously and addressed by insertion offset. Search is
/// a linear scan ranking by squared Euclidean distance.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append vectors in order. Offsets continue from the current length.
    #[inline]
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(RagError::Index(format!(
                "Cannot add vector of dimension {} to index of dimension {}",
                bad.len(),
                self.dimension
            )));
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    #[cfg(test)]
    fn vector(&self, offset: usize) -> Option<&[f32]> {
        let start = offset.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// The `k` nearest stored vectors as `(offset, squared distance)`, closest first.
    ///
    /// Equal distances are ordered by offset.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(RagError::Index(format!(
                "Query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(offset, vector)| (offset, squared_l2(query, vector)))
            .collect();

        scored.sort_by(|a, b| match a.1.total_cmp(&b.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Drop every vector at or after `len`
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len * self.dimension);
    }

    /// Load an index file, or start empty if it does not exist.
    ///
    /// A stored dimension different from `expected_dimension` is refused.
    #[inline]
    pub fn load(path: &Path, expected_dimension: usize) -> Result<Self> {
        if !path.exists() {
            debug!("No index at {}, starting empty", path.display());
            return Ok(Self::new(expected_dimension));
        }

        let mut reader = BufReader::new(File::open(path)?);
        let header = read_header_from(&mut reader, path)?;

        if header.dimension != expected_dimension {
            return Err(RagError::DimensionMismatch {
                persisted: header.dimension,
                configured: expected_dimension,
            });
        }

        let value_count = header
            .count
            .checked_mul(header.dimension)
            .ok_or_else(|| RagError::Index(format!("Corrupt index header in {}", path.display())))?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        if bytes.len() != value_count * 4 {
            return Err(RagError::Index(format!(
                "Index file {} is truncated: expected {} vectors of dimension {}",
                path.display(),
                header.count,
                header.dimension
            )));
        }

        let data = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        debug!(
            "Loaded {} vectors of dimension {} from {}",
            header.count,
            header.dimension,
            path.display()
        );
        Ok(Self {
            dimension: header.dimension,
            data,
        })
    }

    /// Read only the header of an index file
    #[inline]
    pub fn read_header(path: &Path) -> Result<IndexHeader> {
        let mut reader = BufReader::new(File::open(path)?);
        read_header_from(&mut reader, path)
    }

    /// Write the index to `path`, replacing any previous file atomically
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("index.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            writer.write_all(MAGIC)?;
            writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
            writer.write_all(&u32_field(self.dimension, "dimension")?.to_le_bytes())?;
            writer.write_all(&(self.len() as u64).to_le_bytes())?;
            for value in &self.data {
                writer.write_all(&value.to_le_bytes())?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, path)?;

        debug!("Saved {} vectors to {}", self.len(), path.display());
        Ok(())
    }
}

fn read_header_from(reader: &mut impl Read, path: &Path) -> Result<IndexHeader> {
    let mut header = [0_u8; HEADER_LEN];
    reader.read_exact(&mut header).map_err(|_| {
        RagError::Index(format!("{} is too short to be an index file", path.display()))
    })?;

    if &header[0..8] != MAGIC {
        return Err(RagError::Index(format!(
            "{} is not an index file",
            path.display()
        )));
    }

    let version = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
    if version != FORMAT_VERSION {
        return Err(RagError::Index(format!(
            "Unsupported index format version {} in {}",
            version,
            path.display()
        )));
    }

    let dimension = u32::from_le_bytes([header[12], header[13], header[14], header[15]]);
    let mut count = [0_u8; 8];
    count.copy_from_slice(&header[16..24]);
    let count = u64::from_le_bytes(count);

    Ok(IndexHeader {
        dimension: dimension as usize,
        count: usize::try_from(count)
            .map_err(|_| RagError::Index(format!("Corrupt index header in {}", path.display())))?,
    })
}

fn u32_field(value: usize, name: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| RagError::Index(format!("Index {} {} is too large", name, value)))
}

#[inline]
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
