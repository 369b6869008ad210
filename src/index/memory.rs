//! In-memory [`VectorIndex`] implementation.
//!
//! Backs tests and embedding-free local runs (`index.provider = "memory"`).
//! Chunks live in a `Vec` behind an `RwLock`; search scores by term overlap
//! between the query and the chunk text, which is deterministic and needs no
//! embedding service. Filters are evaluated exactly. State does not survive
//! the process.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ChunkRecord, ScoredChunk};

use super::{Filter, VectorIndex};

pub struct MemoryIndex {
    records: RwLock<Vec<ChunkRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Fraction of the query's terms that appear in the text. An empty query
/// scores 0 for everything, which matches the zero-relevance probe contract.
fn term_overlap(query: &str, text: &str) -> f64 {
    let query_terms: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if query_terms.is_empty() {
        return 0.0;
    }
    let text_lower = text.to_lowercase();
    let hits = query_terms
        .iter()
        .filter(|t| text_lower.contains(t.as_str()))
        .count();
    hits as f64 / query_terms.len() as f64
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn insert(&self, chunks: &[ChunkRecord]) -> Result<()> {
        self.records
            .write()
            .expect("lock poisoned")
            .extend_from_slice(chunks);
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredChunk>> {
        let records = self.records.read().expect("lock poisoned");

        let mut results: Vec<ScoredChunk> = records
            .iter()
            .filter(|r| filter.map(|f| f.matches(&r.metadata)).unwrap_or(true))
            .map(|r| ScoredChunk {
                id: r.id.clone(),
                text: r.text.clone(),
                score: term_overlap(query, &r.text),
                metadata: r.metadata.clone(),
            })
            .collect();

        // Stable sort keeps insertion order for ties (backend-native order)
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        self.records
            .write()
            .expect("lock poisoned")
            .retain(|r| !ids.contains(&r.id));
        Ok(())
    }
}
