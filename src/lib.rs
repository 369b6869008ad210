//! # askdocs
//!
//! A document ingestion and retrieval-augmented generation (RAG) service.
//!
//! askdocs accepts uploaded documents, extracts and chunks their text,
//! indexes the chunks (with embeddings and metadata) in a vector store, and
//! answers natural-language questions by retrieving the most relevant chunks
//! and feeding them to a text-generation model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────┐   ┌─────────────┐
//! │ Uploads  │──▶│ Extract + Chunk   │──▶│ VectorIndex │
//! │ (blobs)  │   │ + Embed (ingest)  │   │ (Chroma)    │
//! └──────────┘   └───────────────────┘   └──────┬──────┘
//!                                               │
//!                           ┌───────────────────┤
//!                           ▼                   ▼
//!                      ┌──────────┐       ┌──────────┐
//!                      │   CLI    │       │   HTTP   │
//!                      │(askdocs) │       │  (axum)  │
//!                      └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Pipeline error taxonomy |
//! | [`models`] | Core data types |
//! | [`storage`] | Local blob store for uploaded files |
//! | [`extract`] | Multi-format text extraction |
//! | [`chunk`] | Deterministic text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Vector index clients and filter predicates |
//! | [`ingest`] | Batch ingestion coordination |
//! | [`retrieve`] | Similarity retrieval, membership probing, listing |
//! | [`delete`] | Document deletion coordination |
//! | [`rag`] | Prompt assembly and answer generation |
//! | [`server`] | HTTP API |

pub mod chunk;
pub mod config;
pub mod delete;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod models;
pub mod rag;
pub mod retrieve;
pub mod server;
pub mod storage;
