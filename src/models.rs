//! Core data models used throughout askdocs.
//!
//! These types represent the uploaded files, chunks, and search results that
//! flow through the ingestion and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata value tagged onto every chunk produced from a user upload.
/// Scoped retrieval (`/ask`) filters on it to exclude any pre-seeded corpus.
pub const SOURCE_UPLOADED: &str = "uploaded";

/// A file stored in the blob store, keyed by its client-supplied name.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub filename: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Metadata attached to each indexed chunk.
///
/// Every chunk belonging to one file shares the same `filename` and `source`
/// values; `chunk_index` is the chunk's position within the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,
    pub source: String,
    pub chunk_index: usize,
}

impl ChunkMetadata {
    pub fn uploaded(filename: &str, chunk_index: usize) -> Self {
        Self {
            filename: filename.to_string(),
            source: SOURCE_UPLOADED.to_string(),
            chunk_index,
        }
    }
}

/// A chunk submitted to the vector index. The embedding is computed by the
/// index client at insertion time and never flows back through this type.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A chunk returned from a similarity search, ranked by descending score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub score: f64,
    pub metadata: ChunkMetadata,
}

/// Listing row: blob store metadata merged with the membership probe result.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatus {
    pub filename: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub in_index: bool,
}
