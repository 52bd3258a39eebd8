//! Question answering over an indexed collection.
//!
//! [`RagPipeline::answer`] runs the three steps in order: retrieve the
//! nearest passages, assemble the prompt, ask the model. Each step awaits the
//! previous one and any error stops the run.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::llm::LLMClient;
use crate::rag::index::{DocumentIndex, QueryResult};
use crate::rag::prompt::PromptTemplate;
use crate::types::{AppError, Result};

/// Default number of passages retrieved per question.
pub const DEFAULT_TOP_K: usize = 1;

/// Generated answer plus what it was generated from.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub prompt: String,
    pub passages: QueryResult,
}

pub struct RagPipeline {
    index: DocumentIndex,
    llm: Arc<dyn LLMClient>,
    template: PromptTemplate,
    top_k: usize,
    min_score: Option<f32>,
    require_passages: bool,
}

impl RagPipeline {
    pub fn new(index: DocumentIndex, llm: Arc<dyn LLMClient>) -> Self {
        Self {
            index,
            llm,
            template: PromptTemplate::default(),
            top_k: DEFAULT_TOP_K,
            min_score: None,
            require_passages: false,
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Values below 1 are raised to 1.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Drop retrieved passages whose similarity is below `min_score`.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    /// Fail with `NotFound` instead of asking the model when nothing was
    /// retrieved.
    pub fn with_require_passages(mut self, require: bool) -> Self {
        self.require_passages = require;
        self
    }

    pub fn index_ref(&self) -> &DocumentIndex {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn index(&self, documents: &[String], ids: &[String]) -> Result<usize> {
        self.index.add(documents, ids).await
    }

    pub async fn index_documents(&self, documents: &[String]) -> Result<usize> {
        self.index.add_documents(documents).await
    }

    /// Nearest passages for `question`, after the optional score filter.
    pub async fn retrieve(&self, question: &str) -> Result<QueryResult> {
        let result = self.index.query(question, self.top_k).await?;
        Ok(match self.min_score {
            Some(min_score) => {
                let before = result.len();
                let kept = result.filter_min_score(min_score);
                debug!(before, after = kept.len(), min_score, "score filter applied");
                kept
            }
            None => result,
        })
    }

    #[instrument(skip(self), fields(top_k = self.top_k, model = self.llm.model_name()))]
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(AppError::InvalidInput("question must not be empty".to_string()));
        }

        let passages = self.retrieve(question).await?;
        if passages.is_empty() && self.require_passages {
            return Err(AppError::NotFound(format!(
                "no passages in '{}' match the question",
                self.index.collection()
            )));
        }

        let prompt = self.template.build(question, &passages.documents);
        let text = self.llm.generate(&prompt).await?;
        info!(passages = passages.len(), answer_chars = text.len(), "answered question");

        Ok(Answer {
            text,
            prompt,
            passages,
        })
    }
}
