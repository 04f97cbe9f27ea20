//! The HTTP chat API driven through the router without a network listener.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use kenning::embedding::{Embedder, TaskType};
use kenning::generation::Generator;
use kenning::knowledge_store::{KnowledgeRecord, KnowledgeStore, MemoryKnowledgeStore};
use kenning::rag::RagEngine;
use kenning::server::{router, AppState, Backend, INTERNAL_ERROR_MESSAGE};
use kenning::{KenningError, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct UnitEmbedder;

#[async_trait]
impl Embedder for UnitEmbedder {
    async fn embed(&self, _text: &str, _task: TaskType) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String], task: TaskType) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::new();
        for text in texts {
            out.push(self.embed(text, task).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Replies with the prompt length, or fails when `fail` is set.
struct StubGenerator {
    fail: bool,
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if self.fail {
            return Err(KenningError::Generation("upstream exploded: key=secret".to_string()));
        }
        Ok(format!("Grounded answer ({} chars of prompt)", prompt.len()))
    }

    fn model(&self) -> &str {
        "stub"
    }
}

fn origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

async fn ready_app(records: &[KnowledgeRecord], fail_generation: bool) -> Router {
    let store = Arc::new(MemoryKnowledgeStore::new());
    store.insert_many(records).await.unwrap();

    let engine = RagEngine::new(
        store,
        Arc::new(UnitEmbedder),
        Arc::new(StubGenerator {
            fail: fail_generation,
        }),
    );
    router(Arc::new(AppState::new(Backend::Ready(engine))), &origins())
}

fn degraded_app() -> Router {
    router(
        Arc::new(AppState::new(Backend::Degraded(
            "GEMINI_API_KEY is not set".to_string(),
        ))),
        &origins(),
    )
}

fn chat_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn record(text: &str) -> KnowledgeRecord {
    KnowledgeRecord::new("biography.md", text, vec![1.0, 0.0])
}

#[tokio::test]
async fn health_reports_running_even_when_degraded() {
    let response = degraded_app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "status": "Server is running", "backend": "degraded" })
    );
}

#[tokio::test]
async fn health_reports_ready_backend() {
    let response = ready_app(&[], false)
        .await
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(json_body(response).await["backend"], "ready");
}

#[tokio::test]
async fn chat_returns_generated_reply() {
    let app = ready_app(&[record("Ada builds compilers.")], false).await;

    let response = app
        .oneshot(chat_request(json!({ "message": "What does Ada do?" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["reply"]
        .as_str()
        .unwrap()
        .starts_with("Grounded answer"));
    assert_eq!(body.as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn chat_with_empty_knowledge_base_apologises() {
    let app = ready_app(&[], false).await;

    let response = app
        .oneshot(chat_request(json!({ "message": "Anything?" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["reply"],
        "I'm sorry, I couldn't find any relevant information to answer your question."
    );
}

#[tokio::test]
async fn chat_on_degraded_backend_is_a_generic_500() {
    let response = degraded_app()
        .oneshot(chat_request(json!({ "message": "Hello?" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({ "error": INTERNAL_ERROR_MESSAGE })
    );
}

#[tokio::test]
async fn generation_failure_does_not_leak_details() {
    let app = ready_app(&[record("Ada builds compilers.")], true).await;

    let response = app
        .oneshot(chat_request(json!({ "message": "What does Ada do?" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Internal server error");
    assert!(!body.to_string().contains("secret"));
}

#[tokio::test]
async fn blank_message_is_a_bad_request() {
    let app = ready_app(&[record("Ada builds compilers.")], false).await;

    let response = app
        .oneshot(chat_request(json!({ "message": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let app = ready_app(&[], false).await;

    let response = app
        .oneshot(chat_request(json!({ "question": "wrong field" })))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin_with_credentials() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/chat")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = degraded_app().oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

#[tokio::test]
async fn cors_rejects_unknown_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/chat")
        .header(header::ORIGIN, "https://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = degraded_app().oneshot(request).await.unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
