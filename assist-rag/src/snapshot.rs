//! JSON snapshots of a retrieval index.
//!
//! A snapshot records the embedding procedure and dimension alongside every
//! document's text and vector, so a reload can refuse data produced by a
//! different model instead of silently comparing incompatible vectors.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::DocumentId;
use crate::error::{RagError, Result};

/// Current on-disk format version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// One stored document with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotEntry {
    /// The document id; must equal the entry's position.
    pub id: DocumentId,
    /// The document text.
    pub text: String,
    /// The document's embedding vector.
    pub embedding: Vec<f32>,
}

/// Serialisable contents of a [`RetrievalIndex`](crate::RetrievalIndex).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexSnapshot {
    /// On-disk format version.
    pub format_version: u32,
    /// [`model_id`](crate::EmbeddingProvider::model_id) of the provider that produced the vectors.
    pub embedder: String,
    /// Embedding dimension.
    pub dimensions: usize,
    /// Documents in id order.
    pub documents: Vec<SnapshotEntry>,
}

impl IndexSnapshot {
    /// Create a snapshot in the current format version.
    pub fn new(
        embedder: impl Into<String>,
        dimensions: usize,
        documents: Vec<SnapshotEntry>,
    ) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            embedder: embedder.into(),
            dimensions,
            documents,
        }
    }

    /// Check the snapshot can be served by an index using `embedder` at `dimensions`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexCorruption`] describing the first violation found.
    pub fn validate(&self, embedder: &str, dimensions: usize) -> Result<()> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(RagError::IndexCorruption(format!(
                "unsupported snapshot format version {}",
                self.format_version
            )));
        }
        if self.embedder != embedder {
            return Err(RagError::IndexCorruption(format!(
                "snapshot was embedded with '{}' but the index uses '{embedder}'",
                self.embedder
            )));
        }
        if self.dimensions != dimensions {
            return Err(RagError::IndexCorruption(format!(
                "snapshot dimension {} does not match index dimension {dimensions}",
                self.dimensions
            )));
        }
        for (position, entry) in self.documents.iter().enumerate() {
            if entry.id.get() != position as u64 {
                return Err(RagError::IndexCorruption(format!(
                    "snapshot entry {position} carries id {}",
                    entry.id
                )));
            }
            if entry.embedding.len() != dimensions {
                return Err(RagError::IndexCorruption(format!(
                    "document {} has a {}-dimensional embedding, expected {dimensions}",
                    entry.id,
                    entry.embedding.len()
                )));
            }
        }
        Ok(())
    }
}

/// Read and parse a snapshot file.
pub fn read_snapshot(path: &Path) -> Result<IndexSnapshot> {
    let file = File::open(path).map_err(|e| snapshot_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| snapshot_error(path, e))
}

/// Write a snapshot to `path` via a temporary file in the same directory,
/// so readers see either the old file or the complete new one.
pub fn write_snapshot(path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| snapshot_error(path, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, snapshot).map_err(|e| snapshot_error(path, e))?;
        writer.flush().map_err(|e| snapshot_error(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| snapshot_error(path, e))?;
    tmp.persist(path).map_err(|e| snapshot_error(path, e.error))?;
    Ok(())
}

fn snapshot_error(path: &Path, err: impl std::fmt::Display) -> RagError {
    RagError::Snapshot { path: path.to_path_buf(), message: err.to_string() }
}
