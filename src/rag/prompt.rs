//! Prompt assembly.
//!
//! The prompt is line oriented: an instruction preamble, one `QUESTION:` line
//! and one `PASSAGE:` line per retrieved passage. Line breaks inside the
//! question or a passage are flattened to spaces so no source text can start a
//! line of its own.

use serde::{Deserialize, Serialize};

/// Built-in instruction preamble.
pub const DEFAULT_PREAMBLE: &str = "You are a helpful and informative bot that answers questions \
using text from the reference passages included below. Respond in complete sentences and be \
comprehensive, including all relevant background information. You are talking to a \
non-technical audience, so break down complicated concepts and keep a friendly, \
conversational tone. If a passage is irrelevant to the answer, you may ignore it.";

/// Instruction preamble plus the fixed `QUESTION:` / `PASSAGE:` layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    pub preamble: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
        }
    }

    /// Compose the prompt for `question` over `passages`, keeping passage
    /// order. An empty `passages` slice yields a prompt with no `PASSAGE:`
    /// lines.
    pub fn build<S: AsRef<str>>(&self, question: &str, passages: &[S]) -> String {
        let mut prompt = String::with_capacity(
            self.preamble.len()
                + question.len()
                + passages.iter().map(|p| p.as_ref().len() + 10).sum::<usize>()
                + 16,
        );
        prompt.push_str(self.preamble.trim_end());
        prompt.push_str("\n\nQUESTION: ");
        prompt.push_str(&one_line(question));
        prompt.push('\n');
        for passage in passages {
            prompt.push_str("PASSAGE: ");
            prompt.push_str(&one_line(passage.as_ref()));
            prompt.push('\n');
        }
        prompt
    }
}

/// Replace every line break (`\r\n`, `\n`, `\r`) with a single space.
pub fn one_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}
