//! Tests for the LLM clients and provider selection.

mod common;

use std::time::Duration;

use common::gemini_answer;
use docqa::llm::{GeminiClient, LLMClient, LLMClientFactory, Provider};
use docqa::rag::RetryPolicy;
use docqa::types::AppError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/models/gemini-2.0-flash:generateContent";

fn client(server: &MockServer, retry: RetryPolicy) -> GeminiClient {
    GeminiClient::new(
        "test-key",
        &server.uri(),
        "gemini-2.0-flash",
        Duration::from_secs(5),
        retry,
    )
    .unwrap()
}

#[tokio::test]
async fn test_gemini_generate_sends_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "What is 2+2?" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_answer("Four.")))
        .expect(1)
        .mount(&server)
        .await;

    let answer = client(&server, RetryPolicy::none())
        .generate("What is 2+2?")
        .await
        .unwrap();

    assert_eq!(answer, "Four.");
}

#[tokio::test]
async fn test_gemini_system_instruction_and_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_partial_json(json!({
            "systemInstruction": { "parts": [{ "text": "Be terse." }] },
            "generationConfig": { "temperature": 0.5 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_answer("Ok.")))
        .expect(1)
        .mount(&server)
        .await;

    let answer = client(&server, RetryPolicy::none())
        .with_temperature(Some(0.5))
        .generate_with_system("Be terse.", "Hi")
        .await
        .unwrap();

    assert_eq!(answer, "Ok.");
}

#[tokio::test]
async fn test_gemini_retries_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_answer("Done.")))
        .mount(&server)
        .await;

    let answer = client(&server, RetryPolicy::immediate(3))
        .generate("go")
        .await
        .unwrap();

    assert_eq!(answer, "Done.");
}

#[tokio::test]
async fn test_gemini_bad_request_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid argument"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, RetryPolicy::immediate(3))
        .generate("go")
        .await
        .unwrap_err();

    match err {
        AppError::Upstream {
            service,
            status,
            message,
        } => {
            assert_eq!(service, "gemini");
            assert_eq!(status, 400);
            assert!(message.contains("invalid argument"));
        }
        other => panic!("expected Upstream, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gemini_blocked_prompt_is_an_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
        )
        .mount(&server)
        .await;

    let err = client(&server, RetryPolicy::none())
        .generate("go")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::LLM(_)));
}

#[tokio::test]
async fn test_factory_builds_gemini_client() {
    let factory = LLMClientFactory::new(Provider::Gemini {
        api_key: "key".to_string(),
        api_base: "http://localhost:1".to_string(),
        model: "models/gemini-2.0-flash".to_string(),
        temperature: Some(0.2),
    })
    .with_retry(RetryPolicy::none())
    .with_timeout(Duration::from_secs(1));

    let client = factory.create_default().await.unwrap();

    assert_eq!(client.model_name(), "models/gemini-2.0-flash");
    assert_eq!(factory.default_provider().name(), "Gemini");
}

#[cfg(feature = "ollama")]
#[tokio::test]
async fn test_ollama_chat_against_mock_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "created_at": "2024-01-01T00:00:00Z",
            "message": { "role": "assistant", "content": "Hello from Ollama" },
            "done": true
        })))
        .mount(&server)
        .await;

    let client = Provider::Ollama {
        base_url: server.uri(),
        model: "llama3.2".to_string(),
    }
    .create_client()
    .await
    .unwrap();

    assert_eq!(client.generate("Hi").await.unwrap(), "Hello from Ollama");
    assert_eq!(client.model_name(), "llama3.2");
}
