//! Chroma vector store client.
//!
//! Talks to the Chroma HTTP API (v1): the collection is resolved or created
//! at connect time, chunk batches are embedded through the configured
//! [`EmbeddingProvider`] and added with their metadata, and similarity
//! queries run with a structured `where` clause. Chroma reports distances;
//! scores surface as `1 − distance` so higher means more similar.
//!
//! An empty query is treated as a zero-relevance probe: a zero vector of the
//! embedder's dimensionality is queried instead of calling the embedding
//! service, which keeps membership checks and deletion scans working even
//! when the query has no meaningful text.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::IndexConfig;
use crate::embedding::EmbeddingProvider;
use crate::models::{ChunkMetadata, ChunkRecord, ScoredChunk};

use super::{Filter, VectorIndex};

const HTTP_TIMEOUT_SECS: u64 = 60;

pub struct ChromaIndex {
    client: reqwest::Client,
    base_url: String,
    collection_id: String,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl ChromaIndex {
    /// Connect to Chroma and resolve (or create) the configured collection.
    pub async fn connect(
        config: &IndexConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        let base_url = config.url.trim_end_matches('/').to_string();

        let response = client
            .post(format!("{}/api/v1/collections", base_url))
            .json(&serde_json::json!({
                "name": config.collection,
                "get_or_create": true,
                "metadata": { "hnsw:space": "cosine" },
            }))
            .send()
            .await
            .with_context(|| format!("Failed to reach Chroma at {}", base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Chroma collection error {}: {}", status, body);
        }

        let json: serde_json::Value = response.json().await?;
        let collection_id = json
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Chroma collection response missing id"))?
            .to_string();

        info!(
            collection = %config.collection,
            collection_id = %collection_id,
            "connected to Chroma"
        );

        Ok(Self {
            client,
            base_url,
            collection_id,
            embedder,
        })
    }

    fn collection_url(&self, op: &str) -> String {
        format!(
            "{}/api/v1/collections/{}/{}",
            self.base_url, self.collection_id, op
        )
    }

    async fn post(&self, op: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(self.collection_url(op))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Chroma {} request failed", op))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Chroma {} error {}: {}", op, status, text);
        }

        Ok(response.json().await.unwrap_or(serde_json::Value::Null))
    }

    async fn query_vector(&self, query: &str) -> Result<Vec<f32>> {
        if query.is_empty() {
            // Zero-relevance probe
            return Ok(vec![0.0; self.embedder.dims()]);
        }
        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response for query"))
    }
}

#[async_trait]
impl VectorIndex for ChromaIndex {
    async fn insert(&self, chunks: &[ChunkRecord]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != chunks.len() {
            bail!(
                "Embedding count mismatch: {} texts, {} vectors",
                chunks.len(),
                embeddings.len()
            );
        }

        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        let metadatas: Vec<serde_json::Value> = chunks
            .iter()
            .map(|c| serde_json::to_value(&c.metadata))
            .collect::<Result<_, _>>()?;

        self.post(
            "add",
            &serde_json::json!({
                "ids": ids,
                "embeddings": embeddings,
                "documents": texts,
                "metadatas": metadatas,
            }),
        )
        .await?;

        debug!(count = chunks.len(), "inserted chunks into Chroma");
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vec = self.query_vector(query).await?;

        let mut body = serde_json::json!({
            "query_embeddings": [query_vec],
            "n_results": top_k,
            "include": ["documents", "metadatas", "distances"],
        });
        if let Some(f) = filter {
            body["where"] = f.to_where_clause();
        }

        let json = self.post("query", &body).await?;
        parse_query_response(&json)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.post("delete", &serde_json::json!({ "ids": ids })).await?;
        debug!(count = ids.len(), "deleted chunks from Chroma");
        Ok(())
    }
}

/// Parse Chroma's column-oriented query response (one row per query vector;
/// we always send exactly one).
fn parse_query_response(json: &serde_json::Value) -> Result<Vec<ScoredChunk>> {
    fn first_row<'a>(json: &'a serde_json::Value, key: &str) -> Option<&'a Vec<serde_json::Value>> {
        json.get(key)?.as_array()?.first()?.as_array()
    }

    let ids = first_row(json, "ids")
        .ok_or_else(|| anyhow::anyhow!("Chroma query response missing ids"))?;
    let empty = Vec::new();
    let documents = first_row(json, "documents").unwrap_or(&empty);
    let metadatas = first_row(json, "metadatas").unwrap_or(&empty);
    let distances = first_row(json, "distances").unwrap_or(&empty);

    let mut results = Vec::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        let id = id
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Chroma returned a non-string chunk id"))?;
        let text = documents
            .get(i)
            .and_then(|d| d.as_str())
            .unwrap_or_default()
            .to_string();
        let metadata: ChunkMetadata = metadatas
            .get(i)
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .with_context(|| format!("Chunk {} has malformed metadata", id))?
            .ok_or_else(|| anyhow::anyhow!("Chunk {} is missing metadata", id))?;
        let distance = distances.get(i).and_then(|d| d.as_f64()).unwrap_or(0.0);

        results.push(ScoredChunk {
            id: id.to_string(),
            text,
            score: 1.0 - distance,
            metadata,
        });
    }

    Ok(results)
}
