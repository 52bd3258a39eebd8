use std::sync::Arc;

use anyhow::{Context, Result};
use docqa::cli::output::Output;
use docqa::cli::{self, Cli, Commands, CorpusArgs};
use docqa::db::VectorStore;
use docqa::llm::{LLMClient, LLMClientFactory};
use docqa::rag::{DocumentIndex, GeminiEmbedder, QueryResult, RagPipeline};
use docqa::DocqaConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Err(err) = run(cli, &output).await {
        output.error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let config = DocqaConfig::discover(cli.config.as_deref())
        .context("failed to load configuration")?;
    init_tracing(&config, cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Ask {
            question,
            corpus,
            show_prompt,
        } => {
            let index = open_index(&config).await?;
            load_corpus(&index, &corpus.docs, output).await?;

            let pipeline = RagPipeline::new(index, open_llm(&config).await?)
                .with_template(config.prompt.clone())
                .with_top_k(top_k(&config, &corpus))
                .with_min_score(config.retrieval.min_score)
                .with_require_passages(config.retrieval.require_passages);

            let answer = pipeline.answer(&question).await?;

            if show_prompt {
                output.header("Prompt");
                output.block(&answer.prompt);
            }
            if cli.verbose {
                print_passages(output, &answer.passages);
            }
            output.header("Answer");
            output.block(&answer.text);
            output.newline();
        }

        Commands::Retrieve { question, corpus } => {
            let index = open_index(&config).await?;
            load_corpus(&index, &corpus.docs, output).await?;

            let mut result = index.query(&question, top_k(&config, &corpus)).await?;
            if let Some(min_score) = config.retrieval.min_score {
                result = result.filter_min_score(min_score);
            }
            print_passages(output, &result);
            output.newline();
        }

        Commands::Prompt {
            question,
            passages,
        } => {
            print!("{}", config.prompt.build(&question, &passages));
        }

        Commands::Config { validate } => {
            output.header("Configuration");
            output.block(&config.to_toml()?);
            output.kv("vector store", config.vector_store().name());
            output.kv("llm provider", config.llm.provider.name());
            if validate {
                config
                    .validate_env()
                    .context("configuration is incomplete")?;
                output.success("configuration is valid");
            }
            output.newline();
        }
    }

    Ok(())
}

fn init_tracing(config: &DocqaConfig, verbose: bool, json: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json || config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

fn top_k(config: &DocqaConfig, corpus: &CorpusArgs) -> usize {
    corpus
        .top_k
        .map(|k| k as usize)
        .unwrap_or(config.retrieval.top_k)
}

async fn open_index(config: &DocqaConfig) -> Result<DocumentIndex> {
    let api_key = config.embedding_api_key()?;
    let embedder = GeminiEmbedder::new(
        &api_key,
        &config.embedding.api_base,
        &config.embedding.model,
        config.embedding.timeout(),
        config.retry.clone(),
    )?;

    let provider = config.vector_store();
    let store: Arc<dyn VectorStore> = Arc::from(
        provider
            .create_store()
            .await
            .with_context(|| format!("failed to open {} vector store", provider.name()))?,
    );

    let index = DocumentIndex::open(
        store,
        Arc::new(embedder),
        config.retrieval.collection.clone(),
    )
    .await?;
    Ok(index)
}

async fn open_llm(config: &DocqaConfig) -> Result<Arc<dyn LLMClient>> {
    let provider = config.llm_provider()?;
    let client = LLMClientFactory::new(provider)
        .with_retry(config.retry.clone())
        .with_timeout(config.llm.timeout())
        .create_default()
        .await
        .context("failed to create LLM client")?;
    Ok(Arc::from(client))
}

async fn load_corpus(index: &DocumentIndex, docs: &[String], output: &Output) -> Result<()> {
    if docs.is_empty() {
        output.info("indexing the built-in car manual demo corpus");
    }
    let stored = cli::load_corpus(index, docs).await?;
    info!(stored, collection = index.collection(), "corpus loaded");
    Ok(())
}

fn print_passages(output: &Output, result: &QueryResult) {
    output.header("Passages");
    if result.is_empty() {
        output.warning("no passages retrieved");
        return;
    }
    for (rank, ((id, document), distance)) in result
        .ids
        .iter()
        .zip(&result.documents)
        .zip(&result.distances)
        .enumerate()
    {
        output.passage(rank + 1, id, *distance, document);
    }
}
