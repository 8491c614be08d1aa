//! Sub-command implementations and their output.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use assist_rag::{DocumentId, EmbeddingProvider, IndexStats, KnowledgeBase, RagError, SearchHit};
use clap::ValueEnum;
use serde::Serialize;
use tracing::{info, warn};

/// How reports are printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Open the knowledge base stored at `index_path`, or an empty one if the
/// file does not exist yet.
pub async fn open(
    index_path: &Path,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<KnowledgeBase> {
    if index_path.exists() {
        return KnowledgeBase::load(embedder, index_path)
            .await
            .with_context(|| format!("failed to load index from {}", index_path.display()));
    }
    info!(path = %index_path.display(), "no snapshot yet, starting empty");
    Ok(KnowledgeBase::builder().embedding_provider(embedder).build()?)
}

#[derive(Debug, Serialize)]
pub struct IngestedFile {
    pub path: PathBuf,
    pub id: DocumentId,
}

#[derive(Debug, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub added: Vec<IngestedFile>,
    pub failed: Vec<FailedFile>,
}

/// Ingest each file, keep going past failures, and save the snapshot if
/// anything was added.
pub async fn ingest(
    kb: &KnowledgeBase,
    index_path: &Path,
    files: &[PathBuf],
) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    for path in files {
        match kb.ingest_document(path).await {
            Ok(id) => report.added.push(IngestedFile { path: path.clone(), id }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ingestion failed");
                report.failed.push(FailedFile { path: path.clone(), error: e.to_string() });
            }
        }
    }

    if !report.added.is_empty() {
        kb.save_snapshot(index_path)
            .await
            .with_context(|| format!("failed to save index to {}", index_path.display()))?;
    }
    Ok(report)
}

#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub no_documents: bool,
    pub hits: Vec<SearchHit>,
}

pub async fn search(kb: &KnowledgeBase, query: &str, top_k: usize) -> Result<SearchReport> {
    let (no_documents, hits) = match kb.search_hits(query, top_k).await {
        Ok(hits) => (false, hits),
        Err(RagError::NoDocuments) => (true, Vec::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(SearchReport { query: query.to_string(), no_documents, hits })
}

#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub index: PathBuf,
    #[serde(flatten)]
    pub stats: IndexStats,
}

pub async fn stats(kb: &KnowledgeBase, index_path: &Path) -> StatsReport {
    StatsReport { index: index_path.to_path_buf(), stats: kb.index().stats().await }
}

/// Render a report as human-readable text or JSON.
pub trait Render: Serialize {
    fn text(&self) -> String;

    fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Text => Ok(self.text()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Render for IngestReport {
    fn text(&self) -> String {
        let mut out = String::new();
        for file in &self.added {
            let _ = writeln!(out, "added {} as document {}", file.path.display(), file.id);
        }
        for file in &self.failed {
            let _ = writeln!(out, "failed {}: {}", file.path.display(), file.error);
        }
        out.trim_end().to_string()
    }
}

impl Render for SearchReport {
    fn text(&self) -> String {
        if self.no_documents {
            return "No documents found. Ingest a file first.".to_string();
        }
        let mut out = String::new();
        for (rank, hit) in self.hits.iter().enumerate() {
            let preview: String = hit.text.chars().take(120).collect();
            let preview = preview.replace('\n', " ");
            let _ = writeln!(
                out,
                "{}. [doc {} | distance {:.4}] {preview}",
                rank + 1,
                hit.id,
                hit.distance
            );
        }
        out.trim_end().to_string()
    }
}

impl Render for StatsReport {
    fn text(&self) -> String {
        format!(
            "index:      {}\ndocuments:  {}\nvectors:    {}\ndimensions: {}\nembedder:   {}",
            self.index.display(),
            self.stats.documents,
            self.stats.vectors,
            self.stats.dimensions,
            self.stats.embedder
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assist_rag::HashingEmbedder;

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashingEmbedder::default())
    }

    #[tokio::test]
    async fn ingest_then_search_across_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("kb.json");
        let notes = dir.path().join("notes.txt");
        let todo = dir.path().join("todo.txt");
        std::fs::write(&notes, "budget meeting moved to friday").unwrap();
        std::fs::write(&todo, "buy milk and eggs").unwrap();

        let kb = open(&index_path, embedder()).await.unwrap();
        let report = ingest(&kb, &index_path, &[notes.clone(), todo]).await.unwrap();
        assert_eq!(report.added.len(), 2);
        assert!(report.failed.is_empty());
        assert!(index_path.exists());

        // A fresh process reopens the snapshot.
        let kb = open(&index_path, embedder()).await.unwrap();
        let report = search(&kb, "when is the budget meeting", 1).await.unwrap();
        assert!(!report.no_documents);
        assert_eq!(report.hits[0].text, "budget meeting moved to friday");
        assert!(report.render(OutputFormat::Text).unwrap().starts_with("1. [doc 0 |"));
    }

    #[tokio::test]
    async fn failures_are_reported_and_do_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("kb.json");
        let empty = dir.path().join("empty.txt");
        let good = dir.path().join("good.txt");
        std::fs::write(&empty, "").unwrap();
        std::fs::write(&good, "hello").unwrap();

        let kb = open(&index_path, embedder()).await.unwrap();
        let files = [dir.path().join("slides.pptx"), empty, good.clone()];
        let report = ingest(&kb, &index_path, &files).await.unwrap();

        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.added[0].id, DocumentId::new(0));
        assert_eq!(report.added[0].path, good);
    }

    #[tokio::test]
    async fn nothing_added_means_nothing_saved() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("kb.json");
        let kb = open(&index_path, embedder()).await.unwrap();
        let report = ingest(&kb, &index_path, &[dir.path().join("a.xlsx")]).await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(!index_path.exists());
    }

    #[tokio::test]
    async fn empty_index_search_says_so() {
        let dir = tempfile::tempdir().unwrap();
        let kb = open(&dir.path().join("kb.json"), embedder()).await.unwrap();
        let report = search(&kb, "anything", 3).await.unwrap();
        assert!(report.no_documents);
        assert_eq!(
            report.render(OutputFormat::Text).unwrap(),
            "No documents found. Ingest a file first."
        );

        let json: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["no_documents"], true);
    }

    #[tokio::test]
    async fn zero_top_k_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let kb = open(&dir.path().join("kb.json"), embedder()).await.unwrap();
        kb.ingest_text("something").await.unwrap();
        assert!(search(&kb, "something", 0).await.is_err());
    }

    #[tokio::test]
    async fn stats_json_is_flat() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("kb.json");
        let kb = open(&index_path, embedder()).await.unwrap();
        kb.ingest_text("one").await.unwrap();

        let report = stats(&kb, &index_path).await;
        let json: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["documents"], 1);
        assert_eq!(json["vectors"], 1);
        assert_eq!(json["dimensions"], 384);
        assert_eq!(json["embedder"], "hashing-fnv1a-v1");
        assert!(report.text().contains("documents:  1"));
    }

    #[tokio::test]
    async fn corrupt_snapshot_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("kb.json");
        std::fs::write(&index_path, "[]").unwrap();
        assert!(open(&index_path, embedder()).await.is_err());
    }
}
