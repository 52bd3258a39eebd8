use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::client::LLMClient;
use crate::rag::embeddings::qualified_model;
use crate::rag::retry::RetryPolicy;
use crate::types::{AppError, Result};
use crate::utils::http::{check_status, json_client, secret_header};

/// Default Gemini generation model.
pub const DEFAULT_GENERATION_MODEL: &str = "models/gemini-2.0-flash";

const SERVICE: &str = "gemini";

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    temperature: Option<f32>,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(
        api_key: &str,
        api_base: &str,
        model: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Configuration("missing Gemini API key".to_string()));
        }
        let model = qualified_model(model)?;
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", secret_header(SERVICE, api_key)?);
        let client = json_client(SERVICE, headers, timeout)?;
        let endpoint = format!(
            "{}/{}:generateContent",
            api_base.trim_end_matches('/'),
            model
        );
        Ok(Self {
            client,
            endpoint,
            model,
            temperature: None,
            retry,
        })
    }

    /// Sampling temperature forwarded in `generationConfig`.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    async fn send(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: system.map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            generation_config: self
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "generating answer");

        let request = &request;
        let response: GenerateContentResponse = self
            .retry
            .run("gemini.generateContent", move || async move {
                let response = self
                    .client
                    .post(&self.endpoint)
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| AppError::transport(SERVICE, e))?;
                let response = check_status(SERVICE, response).await?;
                response
                    .json()
                    .await
                    .map_err(|e| AppError::LLM(format!("failed to parse Gemini response: {}", e)))
            })
            .await?;

        response.into_text()
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.send(None, prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.send(Some(system), prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(AppError::LLM(format!("Gemini produced no answer: {}", reason)));
        };
        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        Ok(text)
    }
}
