// Alignment check between the vector index and the metadata log

use tracing::{info, warn};

use crate::store::metadata::MetadataLog;

/// Result of comparing the vector index with the metadata log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Number of vectors in the index
    pub index_vectors: usize,
    /// Number of records in the metadata log
    pub metadata_records: usize,
    /// Offsets whose record carries a different id
    pub misnumbered: Vec<usize>,
    /// Overall consistency status
    pub is_consistent: bool,
}

impl ConsistencyReport {
    /// Records without a vector, or vectors without a record
    #[inline]
    pub fn length_difference(&self) -> isize {
        self.metadata_records as isize - self.index_vectors as isize
    }

    #[inline]
    pub fn log_issues(&self) {
        if self.is_consistent {
            info!(
                "Index and metadata are aligned ({} entries)",
                self.index_vectors
            );
            return;
        }

        if self.index_vectors != self.metadata_records {
            warn!(
                "Index holds {} vectors but metadata holds {} records",
                self.index_vectors, self.metadata_records
            );
        }
        if !self.misnumbered.is_empty() {
            warn!(
                "{} metadata records have ids that differ from their position (first at offset {})",
                self.misnumbered.len(),
                self.misnumbered[0]
            );
        }
    }
}

/// Compare an index of `index_vectors` entries with a metadata log
#[inline]
pub fn check_consistency(index_vectors: usize, metadata: &MetadataLog) -> ConsistencyReport {
    let misnumbered: Vec<usize> = metadata
        .documents
        .iter()
        .enumerate()
        .filter(|(offset, record)| record.positional_id != *offset)
        .map(|(offset, _)| offset)
        .collect();

    let metadata_records = metadata.len();
    ConsistencyReport {
        index_vectors,
        metadata_records,
        is_consistent: index_vectors == metadata_records && misnumbered.is_empty(),
        misnumbered,
    }
}
