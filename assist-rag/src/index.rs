//! Exact nearest-neighbour retrieval index.
//!
//! [`RetrievalIndex`] pairs a flat buffer of embedding vectors with the
//! document store. Vector N belongs to document id N; both live behind one
//! `tokio::sync::RwLock` so an ingestion appends to both in a single write
//! section and a query never sees one without the other.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::{Document, DocumentId, QueryOutcome, SearchHit};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::snapshot::{IndexSnapshot, SnapshotEntry, read_snapshot, write_snapshot};

/// Counts describing the current contents of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Number of stored documents.
    pub documents: usize,
    /// Number of stored vectors. Always equal to `documents` in a healthy index.
    pub vectors: usize,
    /// Embedding dimension.
    pub dimensions: usize,
    /// Identifier of the embedding procedure.
    pub embedder: String,
}

#[derive(Debug, Default)]
struct IndexState {
    /// Row-major, `dimensions` floats per document.
    vectors: Vec<f32>,
    /// Position equals id.
    documents: Vec<Document>,
}

impl IndexState {
    fn check_consistency(&self, dimensions: usize) -> Result<()> {
        let expected = self.documents.len() * dimensions;
        if self.vectors.len() != expected {
            let message = format!(
                "vector buffer holds {} floats but {} documents need {expected}",
                self.vectors.len(),
                self.documents.len()
            );
            error!(%message, "index/store cardinality mismatch");
            return Err(RagError::IndexCorruption(message));
        }
        Ok(())
    }

    fn document_at(&self, position: usize) -> Result<&Document> {
        match self.documents.get(position) {
            Some(doc) if doc.id.position() == position => Ok(doc),
            Some(doc) => {
                let message = format!("store position {position} holds document {}", doc.id);
                error!(%message, "document id does not match its position");
                Err(RagError::IndexCorruption(message))
            }
            None => {
                let message = format!("vector {position} has no stored document");
                error!(%message, "index/store divergence");
                Err(RagError::IndexCorruption(message))
            }
        }
    }
}

/// An in-memory vector index with exact squared-L2 search.
///
/// Construct one explicitly and share it via `Arc`; there is no global
/// instance. Contents live for as long as the value unless saved with
/// [`save`](RetrievalIndex::save).
///
/// # Example
///
/// ```rust,ignore
/// use assist_rag::{HashingEmbedder, RetrievalIndex};
///
/// let index = RetrievalIndex::new(Arc::new(HashingEmbedder::default()))?;
/// let id = index.ingest("cats are great").await?;
/// let outcome = index.query("cats", 3).await?;
/// ```
pub struct RetrievalIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
    state: RwLock<IndexState>,
}

impl std::fmt::Debug for RetrievalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalIndex")
            .field("embedder", &self.embedder.model_id())
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl RetrievalIndex {
    /// Create an empty index using the provider's dimensionality.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the provider reports zero dimensions.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let dimensions = embedder.dimensions();
        if dimensions == 0 {
            return Err(RagError::ConfigError(format!(
                "embedding provider '{}' reports zero dimensions",
                embedder.model_id()
            )));
        }
        Ok(Self { embedder, dimensions, state: RwLock::new(IndexState::default()) })
    }

    /// Create an empty index, checking the provider against `config.dimensions`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the provider's dimensionality
    /// differs from the configured one.
    pub fn with_config(embedder: Arc<dyn EmbeddingProvider>, config: &RagConfig) -> Result<Self> {
        let actual = embedder.dimensions();
        if actual != config.dimensions {
            return Err(RagError::DimensionMismatch { expected: config.dimensions, actual });
        }
        Self::new(embedder)
    }

    /// The embedding dimension of every stored vector.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The embedding provider used for ingestion and query.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Identifier of the embedding procedure, as recorded in snapshots.
    pub fn embedder_id(&self) -> &str {
        self.embedder.model_id()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.state.read().await.documents.len()
    }

    /// Whether no document has been ingested yet.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.documents.is_empty()
    }

    /// Current document and vector counts.
    pub async fn stats(&self) -> IndexStats {
        let state = self.state.read().await;
        IndexStats {
            documents: state.documents.len(),
            vectors: state.vectors.len() / self.dimensions,
            dimensions: self.dimensions,
            embedder: self.embedder_id().to_string(),
        }
    }

    /// Fetch a stored document by id.
    pub async fn get(&self, id: DocumentId) -> Option<Document> {
        self.state.read().await.documents.get(id.position()).cloned()
    }

    /// Embed `text` and store it as a new document.
    ///
    /// The id is the number of documents stored before this call, so failed
    /// ingestions never consume an id.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyDocument`] if `text` is empty or whitespace-only
    /// - [`RagError::DimensionMismatch`] / [`RagError::EmbeddingError`] if the
    ///   provider misbehaves
    /// - [`RagError::IndexCorruption`] if the index was already inconsistent
    pub async fn ingest(&self, text: impl Into<String>) -> Result<DocumentId> {
        let text = text.into();
        if text.trim().is_empty() {
            debug!("rejecting empty document");
            return Err(RagError::EmptyDocument);
        }

        // Embedding is the expensive part; keep it outside the write lock.
        let embedding = self.embed_checked(&text).await?;

        let mut state = self.state.write().await;
        state.check_consistency(self.dimensions)?;
        let id = DocumentId::from_position(state.documents.len());
        state.vectors.extend_from_slice(&embedding);
        let chars = text.chars().count();
        state.documents.push(Document { id, text });
        drop(state);

        info!(document.id = %id, chars, "ingested document");
        Ok(id)
    }

    /// Return up to `k` stored documents closest to `text`.
    ///
    /// Hits are ordered by ascending squared Euclidean distance, ties broken
    /// by ascending id. Asking for more hits than there are documents returns
    /// every document.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidTopK`] if `k == 0`
    /// - [`RagError::IndexCorruption`] if the vector buffer and the store disagree
    pub async fn query(&self, text: &str, k: usize) -> Result<QueryOutcome> {
        if k == 0 {
            return Err(RagError::InvalidTopK);
        }
        if self.is_empty().await {
            debug!("query against empty index");
            return Ok(QueryOutcome::NoDocuments);
        }

        let query = self.embed_checked(text).await?;

        // Documents are only ever appended, so the index is still non-empty here.
        let state = self.state.read().await;
        state.check_consistency(self.dimensions)?;

        let mut scored: Vec<(f32, usize)> = state
            .vectors
            .chunks_exact(self.dimensions)
            .map(|vector| squared_l2(vector, &query))
            .enumerate()
            .map(|(position, distance)| (distance, position))
            .collect();

        let by_distance_then_id =
            |a: &(f32, usize), b: &(f32, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_distance_then_id);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_distance_then_id);

        let hits = scored
            .into_iter()
            .map(|(distance, position)| {
                let doc = state.document_at(position)?;
                Ok(SearchHit { id: doc.id, text: doc.text.clone(), distance })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(result_count = hits.len(), "query completed");
        Ok(QueryOutcome::Hits(hits))
    }

    /// Capture the current contents as a serialisable snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexCorruption`] if the index is inconsistent.
    pub async fn snapshot(&self) -> Result<IndexSnapshot> {
        let state = self.state.read().await;
        state.check_consistency(self.dimensions)?;
        let documents = state
            .documents
            .iter()
            .zip(state.vectors.chunks_exact(self.dimensions))
            .map(|(doc, vector)| SnapshotEntry {
                id: doc.id,
                text: doc.text.clone(),
                embedding: vector.to_vec(),
            })
            .collect();
        Ok(IndexSnapshot::new(self.embedder_id(), self.dimensions, documents))
    }

    /// Rebuild an index from a snapshot, validating it against `embedder`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexCorruption`] if the snapshot was produced by a
    /// different embedding procedure, has the wrong dimension, or its ids are
    /// not the sequence `0..n`.
    pub fn from_snapshot(
        embedder: Arc<dyn EmbeddingProvider>,
        snapshot: IndexSnapshot,
    ) -> Result<Self> {
        let index = Self::new(embedder)?;
        snapshot.validate(index.embedder_id(), index.dimensions)?;

        let mut state = IndexState {
            vectors: Vec::with_capacity(snapshot.documents.len() * index.dimensions),
            documents: Vec::with_capacity(snapshot.documents.len()),
        };
        for entry in snapshot.documents {
            state.vectors.extend_from_slice(&entry.embedding);
            state.documents.push(Document { id: entry.id, text: entry.text });
        }
        state.check_consistency(index.dimensions)?;

        info!(documents = state.documents.len(), "restored index from snapshot");
        Ok(Self { state: RwLock::new(state), ..index })
    }

    /// Write the index to `path` as JSON, replacing any existing file atomically.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = self.snapshot().await?;
        let count = snapshot.documents.len();
        let path = path.as_ref().to_path_buf();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_snapshot(&target, &snapshot))
            .await
            .map_err(|e| RagError::Snapshot { path: path.clone(), message: e.to_string() })??;
        info!(path = %path.display(), documents = count, "saved index snapshot");
        Ok(())
    }

    /// Load an index previously written with [`save`](RetrievalIndex::save).
    pub async fn load(
        embedder: Arc<dyn EmbeddingProvider>,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let source = path.clone();
        let snapshot = tokio::task::spawn_blocking(move || read_snapshot(&source))
            .await
            .map_err(|e| RagError::Snapshot { path: path.clone(), message: e.to_string() })??;
        Self::from_snapshot(embedder, snapshot)
    }

    async fn embed_checked(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.embedder.embed(text).await.map_err(|e| {
            error!(embedder = self.embedder.model_id(), error = %e, "embedding failed");
            e
        })?;
        if embedding.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(RagError::EmbeddingError {
                provider: self.embedder.model_id().to_string(),
                message: "embedding contains non-finite values".to_string(),
            });
        }
        Ok(embedding)
    }

    #[cfg(test)]
    async fn push_orphan_vector(&self) {
        let mut state = self.state.write().await;
        let zeros = vec![0.0; self.dimensions];
        state.vectors.extend_from_slice(&zeros);
    }
}

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
