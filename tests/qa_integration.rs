use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use docqa::{
    api::create_router,
    config::{ChunkUnit, Config, EmbeddingProvider, SummarySource},
    rag::QaService,
};
use httpmock::{Method::POST, MockServer};
use serde_json::{Value, json};
use tower::ServiceExt;

const BOUNDARY: &str = "docqa-integration-boundary";

const INVOICE: &str = "INVOICE 2024-117\n\
    Bill To: Northwind Traders\n\
    Consulting services delivered during March for the data migration project.\n\
    The total amount due is $420, payable within thirty days of the invoice date.\n\
    Late payments accrue a monthly fee of two percent on the outstanding balance.";

fn test_config(root: &Path, ollama_url: String, provider: EmbeddingProvider) -> Config {
    Config {
        upload_dir: root.join("uploads"),
        index_dir: root.join("index"),
        embedding_provider: provider,
        embedding_model: "all-minilm".into(),
        embedding_dimension: 4,
        ollama_url,
        summarization_model: "summarizer".into(),
        qa_model: "qa".into(),
        chunk_size: 120,
        chunk_overlap: 20,
        chunk_unit: ChunkUnit::Characters,
        retrieval_k: 3,
        max_sources: 3,
        summary_source: SummarySource::LatestUpload,
        summary_context_chars: 900,
        qa_context_chars: 1024,
        model_timeout_secs: 5,
        server_port: None,
    }
}

async fn app_for(config: &Config) -> Router {
    let service = QaService::from_config(config).await.expect("service");
    create_router(Arc::new(service))
}

fn upload_request(filename: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("upload request")
}

fn ask_request(question: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/ask")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "question": question }).to_string()))
        .expect("ask request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn upload_then_summarize_and_answer_through_ollama() {
    let server = MockServer::start_async().await;
    let summary_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("Summarize what this billing document is about")
                .json_body_partial(r#"{"model":"summarizer","options":{"num_predict":140}}"#);
            then.status(200).json_body(json!({
                "response": "A consulting invoice for a data migration project",
                "done": true
            }));
        })
        .await;
    let qa_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("Answer the question using ONLY the context below")
                .json_body_partial(r#"{"model":"qa","options":{"num_predict":150}}"#);
            then.status(200).json_body(json!({
                "response": "The total amount due is $420.",
                "done": true
            }));
        })
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path(), server.base_url(), EmbeddingProvider::Hash);
    let app = app_for(&config).await;

    let (status, body) = send(&app, ask_request("What is the total amount due?")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "answer": "I don't have enough information to answer this question.",
            "sources": []
        })
    );

    let (status, body) = send(&app, upload_request("invoice.txt", INVOICE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Document indexed successfully");
    assert!(body["chunks_indexed"].as_u64().expect("chunks") > 1);

    let (status, body) = send(&app, ask_request("What is this document about?")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["answer"],
        "A consulting invoice for a data migration project."
    );
    assert_eq!(body["sources"], json!([]));
    summary_mock.assert_async().await;

    let (status, body) = send(&app, ask_request("What is the total amount due?")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "The total amount due is $420.");
    let sources = body["sources"].as_array().expect("sources");
    assert!(!sources.is_empty() && sources.len() <= 3);
    qa_mock.assert_async().await;

    let (status, metrics) = send(
        &app,
        Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .expect("metrics request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["documents_indexed"], 1);
    assert_eq!(metrics["questions_answered"], 3);
    assert_eq!(metrics["short_circuits"], 1);
}

#[tokio::test]
async fn model_outage_degrades_to_fallback_answers() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(500).body("model crashed");
        })
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path(), server.base_url(), EmbeddingProvider::Hash);
    let app = app_for(&config).await;
    let (status, _) = send(&app, upload_request("invoice.txt", INVOICE)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, ask_request("Can you summarize this?")).await;
    assert_eq!(status, StatusCode::OK);
    let summary = body["answer"].as_str().expect("answer");
    assert!(summary.contains("Consulting services delivered during March"));
    assert!(summary.ends_with('.'));
    assert_eq!(body["sources"], json!([]));

    let (status, body) = send(&app, ask_request("When is payment due?")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "answer": "There was an error generating an answer. Please try rephrasing your question.",
            "sources": []
        })
    );
}

#[tokio::test]
async fn ollama_embeddings_back_the_index() {
    let server = MockServer::start_async().await;
    let embed_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/embed")
                .json_body_partial(r#"{"model":"all-minilm"}"#);
            then.status(200)
                .json_body(json!({ "embeddings": [[0.1, 0.2, 0.3, 0.4]] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).json_body(json!({
                "response": "The signing date is not mentioned in the context.",
                "done": true
            }));
        })
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path(), server.base_url(), EmbeddingProvider::Ollama);
    let app = app_for(&config).await;

    // Short enough to produce a single chunk, so one vector per embed call.
    let (status, body) = send(
        &app,
        upload_request("note.md", "The offsite moves to the north campus next Friday."),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chunks_indexed"], 1);

    let (status, body) = send(&app, ask_request("When was the contract signed?")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "answer": "I don't know.", "sources": [] }));
    embed_mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn unsupported_upload_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(
        dir.path(),
        "http://127.0.0.1:9".into(),
        EmbeddingProvider::Hash,
    );
    let app = app_for(&config).await;

    let (status, _) = send(&app, upload_request("letter.docx", "hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!dir.path().join("uploads").join("letter.docx").exists());
}
