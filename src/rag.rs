//! Prompt assembly and answer generation.
//!
//! The question path: retrieve the most relevant uploaded chunks, join
//! their text into a context block, render the prompt template, and hand it
//! to the configured [`ChatProvider`]. Retrieval is scoped to
//! `source == "uploaded"` so a pre-seeded reference corpus never leaks into
//! answers about user documents. Generation failures propagate to the
//! caller; this module never retries them.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::{GenerationConfig, RetrievalConfig};
use crate::index::{Filter, VectorIndex};
use crate::models::{ScoredChunk, SOURCE_UPLOADED};
use crate::retrieve::retrieve;

/// Default prompt with `{input}` and `{documents}` placeholders.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
You answer questions about the user's uploaded documents.

Use only the information in the DOCUMENTS section to answer. If the \
documents do not contain the answer, say that you don't know.

DOCUMENTS:
{documents}

QUESTION:
{input}
";

/// Text-generation collaborator: prompt in, text out.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Create the configured [`ChatProvider`].
pub fn create_chat(config: &GenerationConfig) -> Result<Arc<dyn ChatProvider>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaChat::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiChat::new(config)?)),
        "disabled" => bail!("Generation provider is disabled"),
        other => bail!("Unknown generation provider: {}", other),
    }
}

/// Render the prompt template with the question and retrieved chunk texts.
pub fn build_prompt(template: &str, question: &str, chunks: &[ScoredChunk]) -> String {
    let documents = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    template
        .replace("{documents}", &documents)
        .replace("{input}", question)
}

/// Answer a question from the uploaded-document corpus.
pub async fn answer(
    index: &dyn VectorIndex,
    chat: &dyn ChatProvider,
    question: &str,
    retrieval: &RetrievalConfig,
    generation: &GenerationConfig,
) -> Result<String> {
    let filter = Filter::source(SOURCE_UPLOADED);
    let chunks = retrieve(index, question, retrieval.top_k, Some(&filter)).await?;
    info!(
        question,
        retrieved = chunks.len(),
        "assembling generation prompt"
    );

    let template = generation
        .prompt_template
        .as_deref()
        .unwrap_or(DEFAULT_PROMPT_TEMPLATE);
    let prompt = build_prompt(template, question, &chunks);
    debug!(prompt_len = prompt.len(), "prompt assembled");

    chat.generate(&prompt).await
}

// ============ Ollama ============

/// Chat provider using a local Ollama server (`POST {url}/api/generate`,
/// non-streaming).
pub struct OllamaChat {
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaChat {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required"))?;
        Ok(Self {
            model,
            base_url: config.url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
        })
    }
}

#[async_trait]
impl ChatProvider for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Ollama generate error {}: {}", status, body);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
    }
}

// ============ OpenAI ============

/// Chat provider using the OpenAI chat completions API. Requires the
/// `OPENAI_API_KEY` environment variable.
pub struct OpenAiChat {
    model: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required"))?;
        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }
        Ok(Self {
            model,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [ { "role": "user", "content": prompt } ],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("OpenAI chat error {}: {}", status, body);
        }

        let json: serde_json::Value = response.json().await?;
        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::MemoryIndex;
    use crate::models::{ChunkMetadata, ChunkRecord};
    use uuid::Uuid;

    /// Echoes the prompt back, so tests can assert on assembly.
    struct EchoChat;

    #[async_trait]
    impl ChatProvider for EchoChat {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }
    }

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

    #[test]
    fn build_prompt_substitutes_placeholders() {
        let chunks = vec![
            ScoredChunk {
                id: "c1".to_string(),
                text: "first chunk".to_string(),
                score: 0.9,
                metadata: ChunkMetadata::uploaded("a.txt", 0),
            },
            ScoredChunk {
                id: "c2".to_string(),
                text: "second chunk".to_string(),
                score: 0.8,
                metadata: ChunkMetadata::uploaded("a.txt", 1),
            },
        ];
        let prompt = build_prompt("Q: {input}\nD: {documents}", "why?", &chunks);
        assert_eq!(prompt, "Q: why?\nD: first chunk\nsecond chunk");
    }

    #[tokio::test]
    async fn answer_uses_only_uploaded_chunks() {
        let index = MemoryIndex::new();
        index
            .insert(&[
                record("mine.txt", "uploaded", "uploads mention kayaks"),
                record("faq.txt", "seeded", "seeded corpus mentions kayaks"),
            ])
            .await
            .unwrap();

        let out = answer(
            &index,
            &EchoChat,
            "kayaks",
            &RetrievalConfig::default(),
            &GenerationConfig::default(),
        )
        .await
        .unwrap();

        assert!(out.contains("uploads mention kayaks"));
        assert!(!out.contains("seeded corpus"));
        assert!(out.contains("QUESTION:\nkayaks"));
    }

    #[tokio::test]
    async fn answer_rejects_empty_question() {
        let index = MemoryIndex::new();
        let result = answer(
            &index,
            &EchoChat,
            "",
            &RetrievalConfig::default(),
            &GenerationConfig::default(),
        )
        .await;
        assert!(result.is_err());
    }
}
