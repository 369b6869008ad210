//! Document deletion coordination.
//!
//! Removes a document's chunks from the vector index and then its blob from
//! local storage, in that order. The blob is never deleted while index
//! cleanup is unfinished, so a failed index delete leaves the bytes around
//! to re-derive the chunks from. The index scan is capped: a document whose
//! chunk count exceeds `scan_cap` is only partially deleted per call.

use tracing::{info, warn};

use crate::error::PipelineError;
use crate::index::{Filter, VectorIndex};
use crate::storage::BlobStore;

/// Outcome of a deletion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// No chunks for the filename were found in the index. Terminal, not an
    /// error; the blob (if any) is left untouched.
    NotFoundInIndex,
    /// Index chunks were deleted; `blob_deleted` reports whether the local
    /// file still existed when we removed it.
    Deleted {
        chunks_deleted: usize,
        blob_deleted: bool,
    },
}

/// Delete all indexed chunks for `filename` (up to `scan_cap`), then the
/// backing blob.
///
/// Failures map to the pipeline taxonomy: a probe or chunk-delete failure is
/// [`PipelineError::Index`] and leaves the blob in place; a blob-delete
/// failure after successful index cleanup is [`PipelineError::Storage`].
pub async fn delete_document(
    store: &BlobStore,
    index: &dyn VectorIndex,
    filename: &str,
    scan_cap: usize,
) -> Result<DeletionOutcome, PipelineError> {
    let hits = index
        .search("", scan_cap, Some(&Filter::filename(filename)))
        .await
        .map_err(|e| PipelineError::Index(e.to_string()))?;

    if hits.is_empty() {
        info!(filename, "no indexed chunks to delete");
        return Ok(DeletionOutcome::NotFoundInIndex);
    }

    let ids: Vec<String> = hits.into_iter().map(|c| c.id).collect();
    let chunks_deleted = ids.len();

    index
        .delete(&ids)
        .await
        .map_err(|e| PipelineError::Index(e.to_string()))?;
    info!(filename, chunks_deleted, "deleted chunks from index");

    let blob_deleted = store.delete(filename)?;
    if blob_deleted {
        info!(filename, "deleted blob from local storage");
    } else {
        warn!(filename, "blob already absent from local storage");
    }

    Ok(DeletionOutcome::Deleted {
        chunks_deleted,
        blob_deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::MemoryIndex;
    use crate::models::{ChunkMetadata, ChunkRecord};
    use crate::retrieve::is_indexed;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn records(filename: &str, count: usize) -> Vec<ChunkRecord> {
        (0..count)
            .map(|i| ChunkRecord {
                id: Uuid::new_v4().to_string(),
                text: format!("chunk {}", i),
                metadata: ChunkMetadata::uploaded(filename, i),
            })
            .collect()
    }

    fn setup() -> (TempDir, BlobStore, MemoryIndex) {
        let tmp = TempDir::new().unwrap();
        let store = BlobStore::new(tmp.path()).unwrap();
        (tmp, store, MemoryIndex::new())
    }

    #[tokio::test]
    async fn deletes_chunks_and_blob() {
        let (_tmp, store, index) = setup();
        store.put("doc.txt", b"body").unwrap();
        index.insert(&records("doc.txt", 3)).await.unwrap();

        let outcome = delete_document(&store, &index, "doc.txt", 100).await.unwrap();
        assert_eq!(
            outcome,
            DeletionOutcome::Deleted {
                chunks_deleted: 3,
                blob_deleted: true
            }
        );
        assert!(!is_indexed(&index, "doc.txt", 100).await.unwrap());
        assert!(!store.exists("doc.txt"));
    }

    #[tokio::test]
    async fn not_found_in_index_leaves_blob() {
        let (_tmp, store, index) = setup();
        store.put("doc.txt", b"body").unwrap();

        let outcome = delete_document(&store, &index, "doc.txt", 100).await.unwrap();
        assert_eq!(outcome, DeletionOutcome::NotFoundInIndex);
        assert!(store.exists("doc.txt"));
    }

    #[tokio::test]
    async fn missing_blob_is_reported_not_failed() {
        let (_tmp, store, index) = setup();
        index.insert(&records("gone.txt", 1)).await.unwrap();

        let outcome = delete_document(&store, &index, "gone.txt", 100).await.unwrap();
        assert_eq!(
            outcome,
            DeletionOutcome::Deleted {
                chunks_deleted: 1,
                blob_deleted: false
            }
        );
    }

    #[tokio::test]
    async fn scan_cap_truncates_deletion() {
        let (_tmp, store, index) = setup();
        store.put("big.txt", b"body").unwrap();
        index.insert(&records("big.txt", 10)).await.unwrap();

        let outcome = delete_document(&store, &index, "big.txt", 4).await.unwrap();
        assert_eq!(
            outcome,
            DeletionOutcome::Deleted {
                chunks_deleted: 4,
                blob_deleted: true
            }
        );
        // Chunks past the cap survive; the boundary condition is documented
        assert_eq!(index.len(), 6);
        assert!(is_indexed(&index, "big.txt", 100).await.unwrap());
    }

    #[tokio::test]
    async fn deletion_completeness_within_cap() {
        let (_tmp, store, index) = setup();
        store.put("small.txt", b"body").unwrap();
        index.insert(&records("small.txt", 5)).await.unwrap();

        delete_document(&store, &index, "small.txt", 100).await.unwrap();
        let leftovers = index
            .search("", 100, Some(&Filter::filename("small.txt")))
            .await
            .unwrap();
        assert!(leftovers.is_empty());
    }
}
