//! Knowledge base facade.
//!
//! The [`KnowledgeBase`] composes a [`TextExtractor`] with a [`RetrievalIndex`]:
//! files go in through [`ingest_document`](KnowledgeBase::ingest_document),
//! ranked texts come out of [`search`](KnowledgeBase::search).
//!
//! # Example
//!
//! ```rust,ignore
//! use assist_rag::{HashingEmbedder, KnowledgeBase, RagConfig};
//!
//! let kb = KnowledgeBase::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbedder::default()))
//!     .build()?;
//!
//! let id = kb.ingest_document("uploads/notes.txt").await?;
//! let texts = kb.search("what did I note about the budget?", 3).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use assist_extract::{ExtractError, FileExtractor, TextExtractor};
use tracing::{error, info, warn};

use crate::config::RagConfig;
use crate::document::{DocumentId, SearchHit};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::RetrievalIndex;

/// Ingestion and search over uploaded documents.
///
/// Construct one via [`KnowledgeBase::builder()`].
pub struct KnowledgeBase {
    config: RagConfig,
    index: Arc<RetrievalIndex>,
    extractor: Arc<dyn TextExtractor>,
}

impl KnowledgeBase {
    /// Create a new [`KnowledgeBaseBuilder`].
    pub fn builder() -> KnowledgeBaseBuilder {
        KnowledgeBaseBuilder::default()
    }

    /// Restore a knowledge base from a snapshot written by
    /// [`save_snapshot`](KnowledgeBase::save_snapshot), using the default
    /// extractor and a config sized to the index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Snapshot`] if the file cannot be read or parsed, and
    /// [`RagError::IndexCorruption`] if it was written with a different
    /// embedder or is internally inconsistent.
    pub async fn load(
        embedder: Arc<dyn EmbeddingProvider>,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let index = RetrievalIndex::load(embedder, path).await?;
        Self::builder().index(Arc::new(index)).build()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the underlying index.
    pub fn index(&self) -> &Arc<RetrievalIndex> {
        &self.index
    }

    /// Extract the file at `path` and ingest its text.
    ///
    /// The caller is responsible for the file existing.
    ///
    /// # Errors
    ///
    /// - [`RagError::UnsupportedFormat`] if the extractor does not handle the
    ///   extension; the file is not opened
    /// - [`RagError::Extraction`] if the file is unreadable or malformed
    /// - [`RagError::EmptyDocument`] if the file has no usable text
    pub async fn ingest_document(&self, path: impl AsRef<Path>) -> Result<DocumentId> {
        let path = path.as_ref();
        if !self.extractor.supports(path) {
            warn!(path = %path.display(), "unsupported file type");
            return Err(ExtractError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: path
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            }
            .into());
        }

        let text = self.extractor.extract(path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "extraction failed");
            RagError::from(e)
        })?;

        match self.index.ingest(text).await {
            Ok(id) => {
                info!(path = %path.display(), document.id = %id, "added file to knowledge base");
                Ok(id)
            }
            Err(RagError::EmptyDocument) => {
                warn!(path = %path.display(), "could not extract any text");
                Err(RagError::EmptyDocument)
            }
            Err(e) => Err(e),
        }
    }

    /// Ingest text the caller already holds.
    pub async fn ingest_text(&self, text: impl Into<String>) -> Result<DocumentId> {
        self.index.ingest(text).await
    }

    /// Return the texts of the `top_k` documents most relevant to `query`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NoDocuments`] if nothing has been ingested yet, and
    /// [`RagError::InvalidTopK`] if `top_k == 0`.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        let hits = self.search_hits(query, top_k).await?;
        Ok(hits.into_iter().map(|hit| hit.text).collect())
    }

    /// [`search`](KnowledgeBase::search) with the configured `top_k`.
    pub async fn search_default(&self, query: &str) -> Result<Vec<String>> {
        self.search(query, self.config.top_k).await
    }

    /// Like [`search`](KnowledgeBase::search) but keeps ids and distances.
    pub async fn search_hits(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        self.index.query(query, top_k).await?.into_hits()
    }

    /// Persist the index to `path`.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        self.index.save(path).await
    }
}

/// Builder for constructing a [`KnowledgeBase`].
///
/// Either an `embedding_provider` (for a fresh, empty index) or an existing
/// `index` is required. The extractor defaults to [`FileExtractor`] and the
/// config to [`RagConfig::default()`] sized to the provider.
///
/// # Example
///
/// ```rust,ignore
/// let index = Arc::new(RetrievalIndex::load(embedder, "kb.json").await?);
/// let kb = KnowledgeBase::builder()
///     .index(index)
///     .extractor(Arc::new(MyOcrExtractor::new()))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct KnowledgeBaseBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<RetrievalIndex>>,
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl KnowledgeBaseBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider for a new, empty index.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Use an existing index, e.g. one restored from a snapshot.
    pub fn index(mut self, index: Arc<RetrievalIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the text extractor.
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build the [`KnowledgeBase`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if neither an index nor an embedding
    /// provider is set, or both are, and [`RagError::DimensionMismatch`] if
    /// the config's dimension disagrees with the index.
    pub fn build(self) -> Result<KnowledgeBase> {
        let index = match (self.index, self.embedding_provider) {
            (Some(index), None) => index,
            (None, Some(provider)) => {
                let config = self.config.clone().unwrap_or_else(|| RagConfig {
                    dimensions: provider.dimensions(),
                    ..RagConfig::default()
                });
                Arc::new(RetrievalIndex::with_config(provider, &config)?)
            }
            (Some(_), Some(_)) => {
                return Err(RagError::ConfigError(
                    "set either index or embedding_provider, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(RagError::ConfigError(
                    "index or embedding_provider is required".to_string(),
                ));
            }
        };

        let config = self.config.unwrap_or_else(|| RagConfig {
            dimensions: index.dimensions(),
            ..RagConfig::default()
        });
        if config.dimensions != index.dimensions() {
            return Err(RagError::DimensionMismatch {
                expected: config.dimensions,
                actual: index.dimensions(),
            });
        }

        let extractor = self.extractor.unwrap_or_else(|| Arc::new(FileExtractor::new()));
        Ok(KnowledgeBase { config, index, extractor })
    }
}
