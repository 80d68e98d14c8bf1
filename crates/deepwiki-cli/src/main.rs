//! Command-line entry point for deepwiki. Thin: flag parsing, provider
//! selection, and dispatch into the `deepwiki` facade crate. No pipeline
//! logic lives here.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use deepwiki::{EmbeddingBackend, LlmBackend, WorkspaceBuilder};
use deepwiki_domain::value_objects::Language;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "deepwiki")]
#[command(about = "Semantic code search and deep research over a local repository")]
#[command(version)]
struct Cli {
    /// Repository root to operate on.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Path to a `deepwiki.toml` configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// LLM backend to use for `ask` and `watch`.
    #[arg(long, global = true, default_value = "ollama")]
    llm: LlmChoice,

    /// LLM model name.
    #[arg(long, global = true, default_value = "llama3.1")]
    model: String,

    /// Base URL for the Ollama or OpenAI-compatible backend.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// API key for OpenAI-compatible or Anthropic backends (falls back to
    /// `OPENAI_API_KEY` / `ANTHROPIC_API_KEY`).
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Use a local CPU embedding model instead of a remote one.
    #[arg(long, global = true)]
    local_embeddings: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum LlmChoice {
    Ollama,
    Openai,
    Anthropic,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index the repository, incrementally unless `--full` is given.
    Index {
        #[arg(long)]
        full: bool,
    },
    /// Run a semantic search over the indexed repository.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        language: Option<String>,
    },
    /// Ask a question of the Deep Research pipeline.
    Ask { question: String },
    /// Print the persisted index status, if any.
    Status,
    /// Watch the repository and re-index on change.
    Watch,
}

fn build_embedding_backend(cli: &Cli) -> EmbeddingBackend {
    if cli.local_embeddings {
        return EmbeddingBackend::Local;
    }
    EmbeddingBackend::Ollama {
        base_url: cli.base_url.clone().unwrap_or_else(|| "http://localhost:11434".to_string()),
        model: "nomic-embed-text".to_string(),
        dimension: 768,
    }
}

fn build_llm_backend(cli: &Cli) -> LlmBackend {
    match cli.llm {
        LlmChoice::Ollama => LlmBackend::Ollama {
            base_url: cli.base_url.clone().unwrap_or_else(|| "http://localhost:11434".to_string()),
            model: cli.model.clone(),
        },
        LlmChoice::Openai => LlmBackend::OpenAi {
            api_key: cli.api_key.clone().or_else(|| std::env::var("OPENAI_API_KEY").ok()).unwrap_or_default(),
            base_url: cli.base_url.clone(),
            model: cli.model.clone(),
        },
        LlmChoice::Anthropic => LlmBackend::Anthropic {
            api_key: cli.api_key.clone().or_else(|| std::env::var("ANTHROPIC_API_KEY").ok()).unwrap_or_default(),
            base_url: cli.base_url.clone(),
            model: cli.model.clone(),
        },
    }
}

fn parse_language(raw: &str) -> Option<Language> {
    Language::ALL.into_iter().find(|l| l.as_str() == raw)
}

fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    deepwiki_infrastructure::logging::init_logging("info", deepwiki_infrastructure::logging::LogFormat::Text)
        .map_err(anyhow::Error::msg)?;

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => deepwiki_infrastructure::config::ConfigLoader::new().with_config_path(path).load()?,
        None => deepwiki_infrastructure::config::ConfigLoader::new().load()?,
    };

    let embedding = build_embedding_backend(&cli);
    let llm = build_llm_backend(&cli);
    let workspace = WorkspaceBuilder::new(cli.root.clone(), embedding, llm)
        .with_config(config)
        .build()?;

    match cli.command {
        Command::Index { full } => {
            let bar = progress_bar(1);
            bar.set_message("indexing");
            let progress = |message: &str, current: usize, total: usize| {
                if total > 0 {
                    bar.set_length(total as u64);
                }
                bar.set_position(current as u64);
                bar.set_message(message.to_string());
            };
            let status = workspace.index(full, Some(&progress)).await?;
            bar.finish_with_message("done");
            println!(
                "indexed {} files, {} chunks (schema v{})",
                status.total_files, status.total_chunks, status.schema_version
            );
        }
        Command::Search { query, limit, language } => {
            let language = language.as_deref().and_then(parse_language);
            let results = workspace.search(&query, limit, language).await?;
            for result in results {
                println!(
                    "{:.3}  {}:{}-{}  {} {}",
                    result.score, result.chunk.file_path, result.chunk.start_line, result.chunk.end_line, result.chunk.chunk_type, result.chunk.name
                );
            }
        }
        Command::Ask { question } => {
            let progress = |event: &deepwiki_domain::entities::ResearchProgress| {
                println!("[{}] {}", event.step, event.message);
            };
            let result = workspace.ask(&question, Some(&progress), None).await?;
            println!("\n{}\n", result.answer);
            println!("sources:");
            for source in &result.sources {
                println!("  {}:{}-{} ({})", source.file_path, source.start_line, source.end_line, source.name);
            }
        }
        Command::Status => match workspace.status().await? {
            Some(status) => println!(
                "indexed_at={} total_files={} total_chunks={} schema_version={}",
                status.indexed_at, status.total_files, status.total_chunks, status.schema_version
            ),
            None => println!("no index found; run `deepwiki index` first"),
        },
        Command::Watch => {
            println!("watching {} for changes (ctrl-c to stop)", workspace.repo_root().display());
            if let Err(e) = workspace.watch(None).await {
                error!(error = %e, "watcher exited with an error");
            }
        }
    }

    Ok(())
}
