//! Vector index abstraction and filter predicates.
//!
//! The [`VectorIndex`] trait defines the narrow interface the pipeline
//! consumes: insert chunks (the backend embeds their text), similarity
//! search with an optional metadata filter, and deletion by id. Backends:
//! Chroma over HTTP ([`chroma::ChromaIndex`]) and an in-process store for
//! tests and embedding-free local runs ([`memory::MemoryIndex`]).
//!
//! Filters are a closed, typed predicate language over chunk metadata.
//! Serialization to the backend's clause form happens inside the client;
//! filenames are never interpolated into a query-language string, so quote
//! characters in a filename cannot change the shape of a filter.

pub mod chroma;
pub mod memory;

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::IndexConfig;
use crate::embedding::EmbeddingProvider;
use crate::models::{ChunkMetadata, ChunkRecord, ScoredChunk};

/// The metadata keys filters may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Filename,
    Source,
}

impl MetadataField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::Filename => "filename",
            MetadataField::Source => "source",
        }
    }
}

/// A structured filter over chunk metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals(MetadataField, String),
    And(Vec<Filter>),
}

impl Filter {
    /// `filename == value`
    pub fn filename(value: &str) -> Self {
        Filter::Equals(MetadataField::Filename, value.to_string())
    }

    /// `source == value`
    pub fn source(value: &str) -> Self {
        Filter::Equals(MetadataField::Source, value.to_string())
    }

    /// Serialize to Chroma's `where` clause form
    /// (`{"filename": {"$eq": ...}}`, `{"$and": [...]}`).
    pub fn to_where_clause(&self) -> serde_json::Value {
        match self {
            Filter::Equals(field, value) => serde_json::json!({
                field.as_str(): { "$eq": value }
            }),
            Filter::And(parts) => serde_json::json!({
                "$and": parts.iter().map(Filter::to_where_clause).collect::<Vec<_>>()
            }),
        }
    }

    /// Evaluate against chunk metadata (used by the in-memory backend).
    pub fn matches(&self, meta: &ChunkMetadata) -> bool {
        match self {
            Filter::Equals(MetadataField::Filename, value) => meta.filename == *value,
            Filter::Equals(MetadataField::Source, value) => meta.source == *value,
            Filter::And(parts) => parts.iter().all(|f| f.matches(meta)),
        }
    }
}

/// The similarity store consumed by the ingestion and retrieval pipeline.
///
/// Implementations own the chunks once inserted; chunks are never mutated,
/// only deleted (and possibly re-inserted). `search` with an empty query is
/// a zero-relevance probe: it still honors `top_k` and `filter` but makes no
/// relevance claim about the ordering, which is what membership checks and
/// deletion scans need.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed and insert a batch of chunks.
    async fn insert(&self, chunks: &[ChunkRecord]) -> Result<()>;

    /// Similarity search, descending score, at most `top_k` results.
    /// Ties are broken in backend-native order.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Delete chunks by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<()>;
}

/// Create the configured [`VectorIndex`] backend.
///
/// The Chroma backend resolves (or creates) its collection up front, so
/// connectivity problems surface at startup rather than on first insert.
pub async fn create_index(
    config: &IndexConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
) -> Result<Arc<dyn VectorIndex>> {
    match config.provider.as_str() {
        "chroma" => {
            let embedder =
                embedder.ok_or_else(|| anyhow::anyhow!("chroma index requires an embedder"))?;
            Ok(Arc::new(chroma::ChromaIndex::connect(config, embedder).await?))
        }
        "memory" => Ok(Arc::new(memory::MemoryIndex::new())),
        other => bail!("Unknown index provider: {}", other),
    }
}
