//! Gemini embedding client tests against a mocked API.
//!
//! These tests use wiremock to stand in for `batchEmbedContents` and verify:
//! - Request shape (model, task type, API key header)
//! - Output order and length
//! - Retry on 429/503, no retry on other errors
//! - Malformed responses

mod common;

use std::time::Duration;

use common::{gemini_embeddings, strings};
use docqa::rag::{Embedder, EmbeddingMode, GeminiEmbedder, RetryPolicy};
use docqa::types::AppError;
use rstest::rstest;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EMBED_PATH: &str = "/models/text-embedding-004:batchEmbedContents";

fn embedder(server: &MockServer, retry: RetryPolicy) -> GeminiEmbedder {
    GeminiEmbedder::new(
        "test-key",
        &server.uri(),
        "text-embedding-004",
        Duration::from_secs(5),
        retry,
    )
    .unwrap()
}

// ============= Request / Response =============

#[tokio::test]
async fn test_embed_preserves_order_and_length() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EMBED_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_embeddings(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.5, 0.5],
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let vectors = embedder(&server, RetryPolicy::none())
        .embed(&strings(&["a", "b", "c"]), EmbeddingMode::Document)
        .await
        .unwrap();

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]);
}

#[rstest]
#[case(EmbeddingMode::Document, "RETRIEVAL_DOCUMENT")]
#[case(EmbeddingMode::Query, "RETRIEVAL_QUERY")]
#[tokio::test]
async fn test_mode_selects_task_type(#[case] mode: EmbeddingMode, #[case] task_type: &str) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EMBED_PATH))
        .and(body_partial_json(json!({
            "requests": [{
                "model": "models/text-embedding-004",
                "content": { "parts": [{ "text": "hello" }] },
                "taskType": task_type
            }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gemini_embeddings(&[vec![0.1, 0.2]])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let vectors = embedder(&server, RetryPolicy::none())
        .embed(&strings(&["hello"]), mode)
        .await
        .unwrap();

    assert_eq!(vectors.len(), 1);
}

#[tokio::test]
async fn test_count_mismatch_is_an_embedding_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EMBED_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gemini_embeddings(&[vec![1.0]])),
        )
        .mount(&server)
        .await;

    let err = embedder(&server, RetryPolicy::none())
        .embed(&strings(&["a", "b"]), EmbeddingMode::Document)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Embedding(_)));
}

#[tokio::test]
async fn test_empty_input_is_rejected_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = embedder(&server, RetryPolicy::none());

    assert!(matches!(
        client.embed(&[], EmbeddingMode::Query).await,
        Err(AppError::InvalidInput(_))
    ));
    assert!(matches!(
        client.embed(&strings(&["  "]), EmbeddingMode::Query).await,
        Err(AppError::InvalidInput(_))
    ));
}

// ============= Retry Behaviour =============

#[rstest]
#[case(429)]
#[case(503)]
#[tokio::test]
async fn test_transient_error_then_success(#[case] status: u16) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EMBED_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string("slow down"))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(EMBED_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gemini_embeddings(&[vec![0.3, 0.4]])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let vectors = embedder(&server, RetryPolicy::immediate(5))
        .embed(&strings(&["retry me"]), EmbeddingMode::Query)
        .await
        .unwrap();

    assert_eq!(vectors, vec![vec![0.3, 0.4]]);
}

#[rstest]
#[case(400)]
#[case(401)]
#[case(500)]
#[tokio::test]
async fn test_non_transient_error_is_not_retried(#[case] status: u16) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EMBED_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let err = embedder(&server, RetryPolicy::immediate(5))
        .embed(&strings(&["x"]), EmbeddingMode::Document)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(status));
    assert!(matches!(err, AppError::Upstream { .. }));
}

#[tokio::test]
async fn test_persistent_unavailability_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EMBED_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = embedder(&server, RetryPolicy::immediate(3))
        .embed(&strings(&["x"]), EmbeddingMode::Document)
        .await
        .unwrap_err();

    match err {
        AppError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.status(), Some(503));
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
}
