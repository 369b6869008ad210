//! HTTP API tests.
//!
//! Serves the real router on an ephemeral port with the in-memory index and
//! a temp-dir blob store, then drives it with a reqwest client: upload,
//! process, list, ask, and delete, including the partial-success and
//! not-found paths.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;

use askdocs::config::Config;
use askdocs::index::memory::MemoryIndex;
use askdocs::rag::ChatProvider;
use askdocs::server::{build_router, AppState};
use askdocs::storage::BlobStore;

/// Returns the prompt verbatim so tests can assert on what was assembled.
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

fn test_config(tmp: &TempDir) -> Config {
    let content = format!(
        r#"
[storage]
root = "{}"

[index]
provider = "memory"

[chunking]
max_tokens = 50
overlap_tokens = 5
"#,
        tmp.path().display()
    );
    toml::from_str(&content).unwrap()
}

/// Spawn the router on an ephemeral port. Returns the bound address; the
/// server task runs until the test process exits.
async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.ok();
    });
    addr
}

async fn start(with_chat: bool) -> (SocketAddr, TempDir) {
    let tmp = TempDir::new().unwrap();
    let config = Arc::new(test_config(&tmp));
    let store = Arc::new(BlobStore::new(&config.storage.root).unwrap());
    let index = Arc::new(MemoryIndex::new());
    let chat: Option<Arc<dyn ChatProvider>> = if with_chat {
        Some(Arc::new(EchoChat))
    } else {
        None
    };
    let addr = spawn_server(AppState::new(config, store, index, chat)).await;
    (addr, tmp)
}

#[tokio::test]
async fn health_reports_ok() {
    let (addr, _tmp) = start(false).await;
    let resp = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn upload_process_list_delete_roundtrip() {
    let (addr, _tmp) = start(false).await;
    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    // Upload two text files in one multipart request
    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"alpha beta gamma".to_vec())
                .file_name("a.txt"),
        )
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"delta epsilon".to_vec()).file_name("b.txt"),
        );
    let resp = client
        .post(format!("{}/api/documents/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["uploaded"].as_array().unwrap().len(), 2);
    assert!(body["failed"].as_array().unwrap().is_empty());

    // Uploaded but not yet processed: listed with inIndex = false
    let resp = client
        .get(format!("{}/api/documents/list", base))
        .send()
        .await
        .unwrap();
    let docs: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(docs.len(), 2);
    assert!(docs.iter().all(|d| d["inIndex"] == false));
    assert!(docs.iter().all(|d| d["uploadTime"].as_i64().unwrap() > 0));

    // Process both
    let resp = client
        .post(format!("{}/api/documents/process", base))
        .json(&["a.txt", "b.txt"])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["processedFiles"].as_array().unwrap().len(), 2);
    assert!(body["totalDocumentsAdded"].as_u64().unwrap() >= 2);

    // Now listed as indexed
    let docs: Vec<Value> = client
        .get(format!("{}/api/documents/list", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(docs.iter().all(|d| d["inIndex"] == true));

    // Delete one document
    let resp = client
        .delete(format!("{}/api/documents/a.txt", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["chunksDeleted"].as_u64().unwrap() >= 1);
    assert_eq!(body["blobDeleted"], true);

    // Deleting again: no chunks left, 404
    let resp = client
        .delete(format!("{}/api/documents/a.txt", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    // The other document is untouched
    let docs: Vec<Value> = client
        .get(format!("{}/api/documents/list", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["filename"], "b.txt");
}

#[tokio::test]
async fn process_missing_file_returns_partial_content() {
    let (addr, _tmp) = start(false).await;
    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"real content".to_vec()).file_name("real.txt"),
    );
    client
        .post(format!("{}/api/documents/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/api/documents/process", base))
        .json(&["real.txt", "ghost.txt"])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["processedFiles"], serde_json::json!(["real.txt"]));
    let failed = body["failedFiles"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].as_str().unwrap().starts_with("ghost.txt ("));
}

#[tokio::test]
async fn empty_process_body_is_rejected() {
    let (addr, _tmp) = start(false).await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{}/api/documents/process", addr))
        .json(&Vec::<String>::new())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn ask_returns_answer_grounded_in_uploads() {
    let (addr, _tmp) = start(true).await;
    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"the launch date is in october".to_vec())
            .file_name("plan.txt"),
    );
    client
        .post(format!("{}/api/documents/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/api/documents/process", base))
        .json(&["plan.txt"])
        .send()
        .await
        .unwrap();

    let resp = client
        .get(format!("{}/ask", base))
        .query(&[("message", "launch date")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let text = resp.text().await.unwrap();
    assert!(text.contains("the launch date is in october"));
}

#[tokio::test]
async fn ask_without_generation_provider_is_rejected() {
    let (addr, _tmp) = start(false).await;
    let resp = reqwest::get(format!("http://{}/ask?message=hello", addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "generation_disabled");
}

#[tokio::test]
async fn ask_with_empty_message_is_rejected() {
    let (addr, _tmp) = start(true).await;
    let resp = reqwest::get(format!("http://{}/ask?message=", addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
