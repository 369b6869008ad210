//! Similarity retrieval, membership probing, and document listing.
//!
//! The retrieval engine is stateless: every call re-queries the vector
//! index, results come back in the index's descending-score order, and no
//! secondary sort is imposed on ties.
//!
//! Membership ("is this filename indexed?") is a filtered zero-relevance
//! probe, not an O(1) lookup — the consumed index capability has no direct
//! existence check. Listing N files therefore costs N searches; callers
//! doing bulk listing must budget for that.

use anyhow::{bail, Result};
use tracing::debug;

use crate::index::{Filter, VectorIndex};
use crate::models::{DocumentStatus, ScoredChunk};
use crate::storage::BlobStore;

/// Similarity search for `query`, optionally scoped by `filter`.
/// Returns at most `top_k` chunks, highest score first; fewer when the
/// index holds fewer matches.
pub async fn retrieve(
    index: &dyn VectorIndex,
    query: &str,
    top_k: usize,
    filter: Option<&Filter>,
) -> Result<Vec<ScoredChunk>> {
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }
    let results = index.search(query, top_k, filter).await?;
    debug!(query, results = results.len(), "retrieval complete");
    Ok(results)
}

/// Probe whether any chunk for `filename` exists in the index.
///
/// Errors propagate: a failed probe is not the same as "not indexed".
pub async fn is_indexed(
    index: &dyn VectorIndex,
    filename: &str,
    probe_limit: usize,
) -> Result<bool> {
    let hits = index
        .search("", probe_limit, Some(&Filter::filename(filename)))
        .await?;
    let exists = !hits.is_empty();
    debug!(filename, exists, "membership probe");
    Ok(exists)
}

/// Merge blob store metadata with per-file membership probes.
///
/// Runs one probe per stored file. Files being ingested concurrently may
/// briefly report `in_index = false`; listing is read-only and takes no
/// locks against ingestion or deletion.
pub async fn list_documents(
    store: &BlobStore,
    index: &dyn VectorIndex,
    probe_limit: usize,
) -> Result<Vec<DocumentStatus>> {
    let mut statuses = Vec::new();
    for record in store.list()? {
        let in_index = is_indexed(index, &record.filename, probe_limit).await?;
        statuses.push(DocumentStatus {
            filename: record.filename,
            size_bytes: record.size_bytes,
            uploaded_at: record.uploaded_at,
            in_index,
        });
    }
    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::MemoryIndex;
    use crate::models::{ChunkMetadata, ChunkRecord};
    use tempfile::TempDir;
    use uuid::Uuid;

    fn record(filename: &str, source: &str, text: &str) -> ChunkRecord {
        ChunkRecord {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            metadata: ChunkMetadata {
                filename: filename.to_string(),
                source: source.to_string(),
                chunk_index: 0,
            },
        }
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let index = MemoryIndex::new();
        assert!(retrieve(&index, "   ", 5, None).await.is_err());
    }

    #[tokio::test]
    async fn scoped_retrieval_excludes_other_sources() {
        let index = MemoryIndex::new();
        index
            .insert(&[
                record("upload.txt", "uploaded", "olympic athletes compete"),
                record("faq.txt", "seeded", "olympic athletes compete"),
            ])
            .await
            .unwrap();

        let filter = Filter::source("uploaded");
        let results = retrieve(&index, "olympic athletes", 10, Some(&filter))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.source, "uploaded");
    }

    #[tokio::test]
    async fn membership_tracks_insert_and_delete() {
        let index = MemoryIndex::new();
        assert!(!is_indexed(&index, "a.txt", 100).await.unwrap());

        let r = record("a.txt", "uploaded", "content");
        let id = r.id.clone();
        index.insert(&[r]).await.unwrap();
        assert!(is_indexed(&index, "a.txt", 100).await.unwrap());

        index.delete(&[id]).await.unwrap();
        assert!(!is_indexed(&index, "a.txt", 100).await.unwrap());
    }

    #[tokio::test]
    async fn listing_merges_blob_and_index_state() {
        let tmp = TempDir::new().unwrap();
        let store = BlobStore::new(tmp.path()).unwrap();
        let index = MemoryIndex::new();

        store.put("indexed.txt", b"body").unwrap();
        store.put("pending.txt", b"body").unwrap();
        index
            .insert(&[record("indexed.txt", "uploaded", "body")])
            .await
            .unwrap();

        let statuses = list_documents(&store, &index, 100).await.unwrap();
        assert_eq!(statuses.len(), 2);
        let by_name = |n: &str| statuses.iter().find(|s| s.filename == n).unwrap();
        assert!(by_name("indexed.txt").in_index);
        assert!(!by_name("pending.txt").in_index);
    }
}
