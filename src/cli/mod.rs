//! CLI module for docqa
//!
//! Provides command-line interface parsing for the `docqa` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

#![allow(missing_docs)]

pub mod demo;
pub mod output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::rag::DocumentIndex;
use crate::types::Result;

/// docqa - question answering over a small document collection
///
/// Embeds documents, retrieves the passages closest to a question and asks a
/// generative model to answer from them.
#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "docqa - answer questions from your documents",
    long_about = "Embeds documents, retrieves the passages closest to a question and asks a\n\
                  generative model to answer from them.\n\n\
                  Without --doc the built-in car manual demo corpus is indexed.",
    after_help = "EXAMPLES:\n    \
                  docqa ask \"How do you use the touchscreen to play music?\"\n    \
                  docqa retrieve \"How do I defrost the windshield?\" --top-k 2\n    \
                  docqa prompt \"Why?\" --passage \"Because.\"\n    \
                  docqa --config my.toml config --validate"
)]
pub struct Cli {
    /// Path to the configuration file (default: docqa.toml when present)
    #[arg(short, long, global = true, env = "DOCQA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Documents to index and how many passages to retrieve.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Document text to index (repeatable); defaults to the demo corpus
    #[arg(short, long = "doc", value_name = "TEXT")]
    pub docs: Vec<String>,

    /// Number of passages to retrieve (overrides retrieval.top_k)
    #[arg(short = 'k', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub top_k: Option<u64>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question from the indexed documents
    Ask {
        /// The question to answer
        question: String,

        #[command(flatten)]
        corpus: CorpusArgs,

        /// Also print the prompt sent to the model
        #[arg(long)]
        show_prompt: bool,
    },

    /// Print the passages that would be used to answer a question
    Retrieve {
        /// The question to retrieve passages for
        question: String,

        #[command(flatten)]
        corpus: CorpusArgs,
    },

    /// Print the prompt assembled from a question and passages (no network)
    Prompt {
        /// The question to embed in the prompt
        question: String,

        /// Passage text (repeatable, kept in order)
        #[arg(short, long = "passage", value_name = "TEXT")]
        passages: Vec<String>,
    },

    /// Show the effective configuration
    Config {
        /// Also check that required environment variables are set
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Load `.env` from the working directory, then parse CLI arguments, so
    /// `env = ...` options can be set from the file.
    pub fn parse_args() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }
}

/// Empty the index, then fill it with `docs`, or with the demo corpus when
/// `docs` is empty. Each run answers from exactly the corpus it was given,
/// even on a persistent store.
pub async fn load_corpus(index: &DocumentIndex, docs: &[String]) -> Result<usize> {
    index.reset().await?;
    if docs.is_empty() {
        let (documents, ids) = demo::car_manual();
        index.add(&documents, &ids).await
    } else {
        index.add_documents(docs).await
    }
}
