//! Shared test helpers.

#![allow(dead_code)]

pub mod mocks;

use serde_json::{json, Value};

/// The three car manual passages used across the retrieval tests.
pub fn car_manual() -> (Vec<String>, Vec<String>) {
    docqa::cli::demo::car_manual()
}

/// A Gemini `batchEmbedContents` response body.
pub fn gemini_embeddings(vectors: &[Vec<f32>]) -> Value {
    json!({
        "embeddings": vectors
            .iter()
            .map(|values| json!({ "values": values }))
            .collect::<Vec<_>>()
    })
}

/// A Gemini `generateContent` response body with a single text part.
pub fn gemini_answer(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
