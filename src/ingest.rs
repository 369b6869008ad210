//! Ingestion pipeline orchestration.
//!
//! Coordinates the flow for a batch of stored filenames: blob store →
//! extraction → chunking → vector index. Each file is an isolated unit of
//! work: a missing blob, a parser failure, or an index rejection is recorded
//! in that file's outcome and never aborts its siblings. The batch result is
//! degraded, not failed, when any file fails; callers inspect the per-file
//! outcomes to find what needs retry.
//!
//! Re-processing an already-indexed filename is not detected here — it
//! inserts duplicate chunks. Callers that need idempotence consult
//! [`crate::retrieve::is_indexed`] first.

use tracing::{info, warn};
use uuid::Uuid;

use crate::chunk::split_segments;
use crate::config::ChunkingConfig;
use crate::extract::extract_segments;
use crate::index::VectorIndex;
use crate::models::{ChunkMetadata, ChunkRecord};
use crate::storage::BlobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Processed,
    NotFound,
    ExtractionFailed,
    IndexFailed,
}

/// Per-file result of one ingestion batch. Ephemeral — reported to the
/// caller, never persisted.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub filename: String,
    pub status: ProcessStatus,
    pub chunk_count: usize,
    pub error: Option<String>,
}

impl ProcessOutcome {
    fn failed(filename: &str, status: ProcessStatus, error: String) -> Self {
        Self {
            filename: filename.to_string(),
            status,
            chunk_count: 0,
            error: Some(error),
        }
    }

    /// `"name (reason)"` form used in failure reports.
    pub fn failure_label(&self) -> String {
        match &self.error {
            Some(e) => format!("{} ({})", self.filename, e),
            None => self.filename.clone(),
        }
    }
}

/// Aggregated result of one ingestion batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ProcessOutcome>,
    pub total_chunks_added: usize,
}

impl BatchReport {
    pub fn processed_files(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.status == ProcessStatus::Processed)
            .map(|o| o.filename.clone())
            .collect()
    }

    pub fn failed_files(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.status != ProcessStatus::Processed)
            .map(|o| o.failure_label())
            .collect()
    }

    /// True when at least one file in the batch did not process.
    pub fn is_partial(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.status != ProcessStatus::Processed)
    }
}

/// Process a batch of stored files into the vector index.
///
/// Files are handled independently and sequentially; the only shared state
/// is the append-only outcome list. A slow or failing index call affects
/// only the file being processed.
pub async fn process_files(
    store: &BlobStore,
    index: &dyn VectorIndex,
    chunking: &ChunkingConfig,
    filenames: &[String],
) -> BatchReport {
    let mut report = BatchReport::default();

    for filename in filenames {
        let outcome = process_one(store, index, chunking, filename).await;
        if outcome.status == ProcessStatus::Processed {
            report.total_chunks_added += outcome.chunk_count;
        }
        report.outcomes.push(outcome);
    }

    info!(
        files = filenames.len(),
        chunks_added = report.total_chunks_added,
        failed = report.failed_files().len(),
        "ingestion batch complete"
    );

    report
}

async fn process_one(
    store: &BlobStore,
    index: &dyn VectorIndex,
    chunking: &ChunkingConfig,
    filename: &str,
) -> ProcessOutcome {
    if !store.exists(filename) {
        warn!(filename, "file not found in blob store");
        return ProcessOutcome::failed(
            filename,
            ProcessStatus::NotFound,
            "file not found".to_string(),
        );
    }

    let bytes = match store.read(filename) {
        Ok(b) => b,
        Err(e) => {
            warn!(filename, error = %e, "failed to read blob");
            return ProcessOutcome::failed(filename, ProcessStatus::ExtractionFailed, e.to_string());
        }
    };

    let segments = match extract_segments(filename, &bytes) {
        Ok(s) => s,
        Err(e) => {
            warn!(filename, error = %e, "extraction failed");
            return ProcessOutcome::failed(filename, ProcessStatus::ExtractionFailed, e.to_string());
        }
    };
    info!(filename, segments = segments.len(), "extracted text segments");

    let chunks = split_segments(&segments, chunking.max_tokens, chunking.overlap_tokens);
    let records: Vec<ChunkRecord> = chunks
        .into_iter()
        .map(|c| ChunkRecord {
            id: Uuid::new_v4().to_string(),
            text: c.text,
            metadata: ChunkMetadata::uploaded(filename, c.index),
        })
        .collect();
    info!(filename, chunks = records.len(), "split into chunks");

    if let Err(e) = index.insert(&records).await {
        warn!(filename, error = %e, "vector index insert failed");
        return ProcessOutcome::failed(filename, ProcessStatus::IndexFailed, e.to_string());
    }
    info!(filename, chunks = records.len(), "indexed chunks");

    ProcessOutcome {
        filename: filename.to_string(),
        status: ProcessStatus::Processed,
        chunk_count: records.len(),
        error: None,
    }
}
