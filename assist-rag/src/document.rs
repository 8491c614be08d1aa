//! Data types for documents and search results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Identifier of an ingested document.
///
/// Ids are the 0-based insertion sequence number: the Nth successfully
/// ingested document gets id N. They are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Wrap a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn from_position(position: usize) -> Self {
        Self(position as u64)
    }

    pub(crate) fn position(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A stored document: the whole extracted text of one file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: DocumentId,
    /// The full text content.
    pub text: String,
}

/// A retrieved [`Document`] with its distance to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// The matching document's id.
    pub id: DocumentId,
    /// The matching document's text.
    pub text: String,
    /// Squared Euclidean distance to the query (lower is more relevant).
    pub distance: f32,
}

/// The outcome of a query against the index.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The index holds no documents yet.
    NoDocuments,
    /// Up to `k` hits ordered by ascending distance, ties by ascending id.
    Hits(Vec<SearchHit>),
}

impl QueryOutcome {
    /// Whether the query ran against an empty index.
    pub fn is_no_documents(&self) -> bool {
        matches!(self, Self::NoDocuments)
    }

    /// Convert into the hit list, mapping the empty-index case to
    /// [`RagError::NoDocuments`].
    pub fn into_hits(self) -> Result<Vec<SearchHit>> {
        match self {
            Self::NoDocuments => Err(RagError::NoDocuments),
            Self::Hits(hits) => Ok(hits),
        }
    }
}
