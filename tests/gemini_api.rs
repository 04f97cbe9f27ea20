//! Gemini clients against a mock Generative Language API.

use kenning::embedding::{Embedder, GeminiEmbedder, TaskType};
use kenning::gemini::GeminiClient;
use kenning::generation::{GeminiGenerator, Generator};
use kenning::KenningError;
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

const EMBED_PATH: &str = "/v1beta/models/text-embedding-004:batchEmbedContents";
const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

/// Answers a batch embed request with one `[len(text), 1.0]` vector per input.
struct EchoLengths;

impl Respond for EchoLengths {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let embeddings: Vec<Value> = body["requests"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| {
                let text = r["content"]["parts"][0]["text"].as_str().unwrap();
                json!({ "values": [text.len() as f32, 1.0] })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

fn client(server: &MockServer) -> GeminiClient {
    GeminiClient::new("test-api-key", &server.uri()).unwrap()
}

#[tokio::test]
async fn embed_batch_sends_task_type_and_key_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(EMBED_PATH))
        .and(header("x-goog-api-key", "test-api-key"))
        .and(body_partial_json(json!({
            "requests": [{
                "model": "models/text-embedding-004",
                "taskType": "RETRIEVAL_DOCUMENT",
                "outputDimensionality": 2
            }]
        })))
        .respond_with(EchoLengths)
        .expect(1)
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::with_config(client(&server), "text-embedding-004", 2);
    let vectors = embedder
        .embed_batch(&["hello".to_string()], TaskType::RetrievalDocument)
        .await
        .unwrap();

    assert_eq!(vectors, vec![vec![5.0, 1.0]]);
}

#[tokio::test]
async fn embed_batch_splits_large_batches_and_keeps_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(EMBED_PATH))
        .respond_with(EchoLengths)
        .expect(2)
        .mount(&server)
        .await;

    let embedder =
        GeminiEmbedder::with_config(client(&server), "text-embedding-004", 2).with_batch_size(2);
    let texts: Vec<String> = ["a", "bb", "ccc"].iter().map(|s| s.to_string()).collect();

    let vectors = embedder
        .embed_batch(&texts, TaskType::RetrievalDocument)
        .await
        .unwrap();

    let lengths: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
    assert_eq!(lengths, vec![1.0, 2.0, 3.0]);
}

#[tokio::test]
async fn query_embedding_uses_retrieval_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(EMBED_PATH))
        .and(body_partial_json(json!({
            "requests": [{ "taskType": "RETRIEVAL_QUERY" }]
        })))
        .respond_with(EchoLengths)
        .expect(1)
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new(client(&server));
    let vector = embedder
        .embed("Who is Ada?", TaskType::RetrievalQuery)
        .await
        .unwrap();

    assert_eq!(vector[0], 11.0);
}

#[tokio::test]
async fn embedding_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(EMBED_PATH))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "message": "Resource has been exhausted" }
            })),
        )
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new(client(&server));
    let err = embedder
        .embed_batch(&["x".to_string()], TaskType::RetrievalDocument)
        .await
        .unwrap_err();

    match err {
        KenningError::Embedding(message) => {
            assert!(message.contains("429"), "{}", message);
            assert!(message.contains("exhausted"), "{}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn generate_returns_candidate_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-api-key"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "Say hi" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hi there!" }] },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = GeminiGenerator::new(client(&server), "gemini-1.5-flash");
    let reply = generator.generate("Say hi").await.unwrap();

    assert_eq!(reply, "Hi there!");
}

#[tokio::test]
async fn generate_without_candidates_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let generator = GeminiGenerator::new(client(&server), "gemini-1.5-flash");
    let err = generator.generate("blocked").await.unwrap_err();

    assert!(matches!(err, KenningError::Generation(_)));
}
