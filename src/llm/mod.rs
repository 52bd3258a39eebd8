//! LLM Provider Clients and Abstractions
//!
//! This module provides the answer-synthesis step of the pipeline. Provider
//! specifics stay behind the [`LLMClient`] trait so the pipeline works with
//! any supported model.
//!
//! # Supported Providers
//!
//! - Gemini `generateContent` (always built, shares the embedder's API key)
//! - `ollama` feature: local Ollama server
//! - `openai` feature: OpenAI API and compatible endpoints
//!
//! # Example
//!
//! ```ignore
//! use docqa::llm::{LLMClientFactory, Provider};
//!
//! let factory = LLMClientFactory::new(provider);
//! let client = factory.create_default().await?;
//!
//! let answer = client.generate("What is 2+2?").await?;
//! ```

#![allow(missing_docs)]

/// Core LLM client trait, provider enum and factory.
pub mod client;
/// Gemini `generateContent` over HTTP.
pub mod gemini;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, LLMClientFactory, Provider};
pub use gemini::{GeminiClient, DEFAULT_GENERATION_MODEL};
