//! HTTP surface for docqa.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /upload` – Multipart upload (field `file`) of a `.pdf`, `.txt`, or `.md` document. The
//!   file is stored, extracted, chunked, and embedded, and its chunks replace the previously
//!   indexed document. Returns indexing counters (`chunks_indexed`, `inserted`,
//!   `skipped_duplicates`).
//! - `POST /ask` – Answer `{ "question": ... }` with `{ "answer", "sources" }`. Content-level
//!   failures (no document, nothing retrieved, model errors) are still `200` answers.
//! - `GET /metrics` – Observe ingestion and answer counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Only transport problems (malformed multipart bodies, unsupported files) and infrastructure
//! failures during ingestion map to error statuses.

use crate::ingestion::IngestError;
use crate::rag::{Answer, QaApi};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Largest accepted request body for uploads.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Build the HTTP router exposing the upload and question API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: QaApi + 'static,
{
    Router::new()
        .route("/upload", post(upload_document::<S>))
        .route("/ask", post(ask_question::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

/// Success response for the `POST /upload` endpoint.
#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
    /// Stored file name.
    filename: String,
    /// Number of distinct chunks produced for the document.
    chunks_indexed: usize,
    /// Number of entries now held by the index.
    inserted: usize,
    /// Number of chunks skipped because the same text repeats within the document.
    skipped_duplicates: usize,
}

/// Store and index an uploaded document.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: QaApi,
{
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::BadRequest(error.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("`file` field has no file name".into()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|error| AppError::BadRequest(error.body_text()))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("missing multipart field `file`".into()))?;
    let outcome = service.ingest_upload(&filename, bytes).await?;
    tracing::info!(
        file = %outcome.filename,
        chunks = outcome.chunk_count,
        chunk_size = outcome.chunk_size,
        inserted = outcome.inserted,
        skipped_duplicates = outcome.skipped_duplicates,
        "Upload request completed"
    );
    Ok(Json(UploadResponse {
        message: "Document indexed successfully",
        filename: outcome.filename,
        chunks_indexed: outcome.chunk_count,
        inserted: outcome.inserted,
        skipped_duplicates: outcome.skipped_duplicates,
    }))
}

/// Request body for `POST /ask`.
#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

/// Answer a question about the uploaded documents.
async fn ask_question<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AskRequest>,
) -> Json<Answer>
where
    S: QaApi,
{
    Json(service.answer_question(&request.question).await)
}

/// Return a metrics snapshot with ingestion and answer counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: QaApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/upload",
                description: "Upload a PDF, text, or markdown file as multipart field `file`; it is chunked, embedded, and replaces the previously indexed document. Response returns { \"chunks_indexed\": number, \"inserted\": number, \"skipped_duplicates\": number }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/ask",
                description: "Ask a question. Summary-style questions summarize the latest document; others are answered from retrieved passages. Response returns { \"answer\": string, \"sources\": [string] }.",
                request_example: Some(json!({
                    "question": "What is the total amount due?"
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return ingestion and answer counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    Ingest(IngestError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            AppError::Ingest(error) if error.is_client_error() => {
                (StatusCode::BAD_REQUEST, error.to_string()).into_response()
            }
            AppError::Ingest(error) => {
                tracing::error!(%error, "Upload failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
            }
        }
    }
}

impl From<IngestError> for AppError {
    fn from(inner: IngestError) -> Self {
        Self::Ingest(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::ingestion::{ExtractionError, IngestError, IngestOutcome};
    use crate::metrics::MetricsSnapshot;
    use crate::rag::{Answer, AnswerOutcome, QaApi};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "docqa-test-boundary";

    #[derive(Clone, Copy)]
    enum IngestBehavior {
        Succeed,
        RejectType,
        StorageFailure,
    }

    struct StubQaService {
        uploads: Mutex<Vec<(String, Vec<u8>)>>,
        questions: Mutex<Vec<String>>,
        behavior: IngestBehavior,
    }

    impl StubQaService {
        fn new(behavior: IngestBehavior) -> Arc<Self> {
            Arc::new(Self {
                uploads: Mutex::new(Vec::new()),
                questions: Mutex::new(Vec::new()),
                behavior,
            })
        }
    }

    #[async_trait]
    impl QaApi for StubQaService {
        async fn ingest_upload(
            &self,
            filename: &str,
            bytes: Vec<u8>,
        ) -> Result<IngestOutcome, IngestError> {
            self.uploads
                .lock()
                .await
                .push((filename.to_string(), bytes));
            match self.behavior {
                IngestBehavior::Succeed => Ok(IngestOutcome {
                    filename: filename.to_string(),
                    chunk_count: 4,
                    chunk_size: 500,
                    inserted: 3,
                    skipped_duplicates: 1,
                }),
                IngestBehavior::RejectType => {
                    Err(ExtractionError::UnsupportedType("docx".into()).into())
                }
                IngestBehavior::StorageFailure => Err(IngestError::Storage(
                    std::io::Error::other("disk full"),
                )),
            }
        }

        async fn answer_question(&self, question: &str) -> Answer {
            self.questions.lock().await.push(question.to_string());
            Answer {
                answer: "The total amount due is $420.".into(),
                sources: vec!["Total amount due: $420".into()],
                outcome: AnswerOutcome::Answered,
            }
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_indexed: 1,
                chunks_indexed: 4,
                last_chunk_size: Some(500),
                questions_answered: 2,
                ..MetricsSnapshot::default()
            }
        }
    }

    fn multipart_request(field: &str, filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
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
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn commands_catalog_exposes_upload_and_ask() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let upload = commands
            .iter()
            .find(|cmd| cmd.name == "upload")
            .expect("upload command present");
        assert_eq!(upload.method, "POST");
        assert_eq!(upload.path, "/upload");
        assert!(commands.iter().any(|cmd| cmd.path == "/ask"));
        assert!(commands.len() >= 3);
    }

    #[tokio::test]
    async fn upload_route_forwards_file_to_service() {
        let service = StubQaService::new(IngestBehavior::Succeed);
        let app = create_router(service.clone());

        let response = app
            .oneshot(multipart_request("file", "invoice.txt", "Total amount due: $420"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["message"], "Document indexed successfully");
        assert_eq!(json["filename"], "invoice.txt");
        assert_eq!(json["chunks_indexed"], 4);
        assert_eq!(json["inserted"], 3);
        assert_eq!(json["skipped_duplicates"], 1);

        let uploads = service.uploads.lock().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "invoice.txt");
        assert_eq!(uploads[0].1, b"Total amount due: $420".to_vec());
    }

    #[tokio::test]
    async fn upload_without_file_field_is_bad_request() {
        let service = StubQaService::new(IngestBehavior::Succeed);
        let app = create_router(service.clone());

        let response = app
            .oneshot(multipart_request("attachment", "invoice.txt", "data"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(service.uploads.lock().await.is_empty());
    }

    #[tokio::test]
    async fn ingest_errors_map_to_client_or_server_status() {
        for (behavior, expected) in [
            (IngestBehavior::RejectType, StatusCode::BAD_REQUEST),
            (
                IngestBehavior::StorageFailure,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ] {
            let app = create_router(StubQaService::new(behavior));
            let response = app
                .oneshot(multipart_request("file", "letter.docx", "data"))
                .await
                .expect("router response");
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn ask_route_returns_answer_and_sources_only() {
        let service = StubQaService::new(IngestBehavior::Succeed);
        let app = create_router(service.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/ask")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({ "question": "What is the total amount due?" }).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(
            json,
            json!({
                "answer": "The total amount due is $420.",
                "sources": ["Total amount due: $420"]
            })
        );
        assert_eq!(
            service.questions.lock().await.as_slice(),
            ["What is the total amount due?".to_string()]
        );
    }

    #[tokio::test]
    async fn metrics_route_serializes_snapshot() {
        let app = create_router(StubQaService::new(IngestBehavior::Succeed));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["documents_indexed"], 1);
        assert_eq!(json["last_chunk_size"], 500);
        assert_eq!(json["questions_answered"], 2);
    }

    #[test]
    fn upload_client_errors_are_distinguished() {
        let client = IngestError::Extraction(ExtractionError::Empty(PathBuf::from("a.pdf")));
        let server = IngestError::Storage(std::io::Error::other("disk full"));
        assert!(client.is_client_error());
        assert!(!server.is_client_error());
    }
}
