//! Document retrieval for the assist knowledge base.
//!
//! This crate provides:
//! - [`RetrievalIndex`]: embedding vectors plus document store with exact
//!   squared-L2 nearest-neighbour search
//! - [`KnowledgeBase`]: file ingestion (via `assist-extract`) and search
//! - [`EmbeddingProvider`] with the deterministic [`HashingEmbedder`] and,
//!   behind the `candle` feature, the MiniLM sentence embedder
//! - JSON snapshots for keeping an index across restarts

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod index;
pub mod knowledge;
pub mod snapshot;

#[cfg(feature = "candle")]
pub mod candle;

pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Document, DocumentId, QueryOutcome, SearchHit};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use hashing::HashingEmbedder;
pub use index::{IndexStats, RetrievalIndex, squared_l2};
pub use knowledge::{KnowledgeBase, KnowledgeBaseBuilder};
pub use snapshot::{IndexSnapshot, SNAPSHOT_FORMAT_VERSION, SnapshotEntry};

#[cfg(feature = "candle")]
pub use candle::MiniLmEmbedder;
