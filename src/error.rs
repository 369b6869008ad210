//! Pipeline error taxonomy.
//!
//! Distinguishes the independently-failing stores the pipeline coordinates:
//! the local blob store and the vector index. Batch ingestion never surfaces
//! these directly (per-file outcomes are collected instead); single-item
//! operations such as deletion do. Extraction failures stay inside the
//! ingestion report as [`crate::extract::ExtractError`] strings.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Blob store read/write failure (disk full, permissions, bad name).
    #[error("storage I/O failure: {0}")]
    Storage(#[from] std::io::Error),

    /// The vector index (or its embedding dependency) was unreachable or
    /// rejected the operation.
    #[error("vector index failure: {0}")]
    Index(String),

    /// The named file is unknown to the blob store or the index.
    #[error("not found: {0}")]
    NotFound(String),
}
