//! Command-line tool for managing collections and asking questions
//!
//! Run with: cargo run -p rag-qa --bin rag-qa -- <command>

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rag_qa::{
    config::{default_documents_dir, RagConfig, Settings},
    pipeline::{AskOptions, IngestOptions, Pipeline},
    providers::{
        DocumentStore, EmbeddingBackend, EmbeddingRequest, GenerationParams, GenerationRequest, LocalDocumentStore,
        EMBEDDING_MODELS, GENERATION_MODELS,
    },
};

#[derive(Parser)]
#[command(name = "rag-qa", version, about = "Question answering over your documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file
    #[arg(long, global = true, env = "RAG_QA_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a directory of documents into a collection
    Create {
        /// Collection to create or extend
        #[arg(long, alias = "collection_name")]
        collection_name: Option<String>,
        /// Embedding model (defaults to the configured one)
        #[arg(long, alias = "embedding_model")]
        embedding_model: Option<String>,
        /// Backend expected to serve the embedding model
        #[arg(long, alias = "embedding_backend")]
        embedding_backend: Option<String>,
        /// Directory to read (default: ./documents/<collection>)
        #[arg(long, alias = "documents_dir")]
        documents_dir: Option<PathBuf>,
        /// Chunk size in characters
        #[arg(long, alias = "chunk_size")]
        chunk_size: Option<usize>,
        /// Overlap between chunks in characters
        #[arg(long, alias = "chunk_overlap")]
        chunk_overlap: Option<usize>,
        /// Drop the collection before ingesting
        #[arg(long, alias = "force_recreate", default_value_t = false)]
        force_recreate: bool,
    },
    /// Delete a collection
    Delete {
        #[arg(long, alias = "collection_name")]
        collection_name: Option<String>,
    },
    /// Show collection metadata
    Info {
        #[arg(long, alias = "collection_name")]
        collection_name: Option<String>,
    },
    /// Ask a question
    Ask {
        #[arg(long)]
        question: String,
        #[arg(long, alias = "collection_name")]
        collection_name: Option<String>,
        /// Text model (defaults to the configured one)
        #[arg(long, alias = "model_name")]
        model_name: Option<String>,
        /// Embedding model the collection was built with
        #[arg(long, alias = "embedding_model")]
        embedding_model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long, alias = "top_k")]
        top_k: Option<u32>,
        #[arg(long, alias = "top_p")]
        top_p: Option<f32>,
        #[arg(long, alias = "max_tokens")]
        max_tokens: Option<u32>,
        /// Stop sequences (`\n` is read as a newline)
        #[arg(long, alias = "stop_sequences", num_args = 1..)]
        stop_sequences: Option<Vec<String>>,
        /// Number of chunks to retrieve
        #[arg(long)]
        k: Option<usize>,
    },
    /// List supported models
    ListModels {
        /// Only models served by this backend
        #[arg(long)]
        backend: Option<String>,
        /// Only models of this kind
        #[arg(long, value_enum)]
        modality: Option<Modality>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Modality {
    Text,
    Embedding,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_qa=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            let code = err
                .downcast_ref::<rag_qa::Error>()
                .map(|e| e.kind().exit_code())
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::ListModels { backend, modality } = &cli.command {
        return list_models(backend.as_deref(), *modality);
    }

    let config = RagConfig::load(cli.config.as_deref())?;
    let settings = Settings::from_config(&config).await?;
    let pipeline = Pipeline::from_config(&config, &settings)?;

    match cli.command {
        Commands::Create {
            collection_name,
            embedding_model,
            embedding_backend,
            documents_dir,
            chunk_size,
            chunk_overlap,
            force_recreate,
        } => {
            let collection = collection_name.unwrap_or_else(|| settings.collection_name.clone());
            let model = embedding_model.unwrap_or_else(|| config.embedding.model.clone());
            let embedding = match embedding_backend {
                Some(backend) => EmbeddingRequest::new(backend.parse::<EmbeddingBackend>()?, &model)?,
                None => EmbeddingRequest::for_model(&model)?,
            };
            let options = IngestOptions {
                collection: collection.clone(),
                chunk_size: chunk_size.unwrap_or(config.chunking.chunk_size),
                overlap: chunk_overlap.unwrap_or(config.chunking.chunk_overlap),
                embedding,
                region: settings.region.clone(),
                force_recreate,
            };
            let dir = documents_dir.unwrap_or_else(|| default_documents_dir(&collection));
            create(&pipeline, dir, options).await
        }
        Commands::Delete { collection_name } => {
            let collection = collection_name.unwrap_or_else(|| settings.collection_name.clone());
            pipeline.delete(&collection).await?;
            println!("{} Deleted collection '{}'", style("✓").green(), collection);
            Ok(())
        }
        Commands::Info { collection_name } => {
            let collection = collection_name.unwrap_or_else(|| settings.collection_name.clone());
            let info = pipeline.describe(&collection).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        Commands::Ask {
            question,
            collection_name,
            model_name,
            embedding_model,
            temperature,
            top_k,
            top_p,
            max_tokens,
            stop_sequences,
            k,
        } => {
            let defaults = &config.generation.params;
            let params = GenerationParams {
                temperature: temperature.unwrap_or(defaults.temperature),
                top_k: top_k.unwrap_or(defaults.top_k),
                top_p: top_p.unwrap_or(defaults.top_p),
                max_tokens: max_tokens.unwrap_or(defaults.max_tokens),
                stop_sequences: stop_sequences
                    .map(|s| s.iter().map(|seq| seq.replace("\\n", "\n")).collect())
                    .unwrap_or_else(|| defaults.stop_sequences.clone()),
            };
            let options = AskOptions {
                collection: collection_name.unwrap_or_else(|| settings.collection_name.clone()),
                k: k.unwrap_or(config.retrieval.top_k),
                embedding: EmbeddingRequest::for_model(embedding_model.as_deref().unwrap_or(&config.embedding.model))?,
                generation: GenerationRequest::for_model(model_name.as_deref().unwrap_or(&config.generation.model))?,
                params,
                region: settings.region.clone(),
            };

            let outcome = pipeline.ask(&question, &options).await?;
            println!("{}", outcome.answer);
            Ok(())
        }
        Commands::ListModels { .. } => Ok(()),
    }
}

async fn create(pipeline: &Pipeline, dir: PathBuf, options: IngestOptions) -> anyhow::Result<()> {
    let store = LocalDocumentStore::new(&dir);
    let documents = store.fetch_all("", "").await?;
    if documents.is_empty() {
        anyhow::bail!(rag_qa::Error::not_found(format!(
            "No supported documents in {}",
            dir.display()
        )));
    }

    println!(
        "Ingesting {} documents from {} into '{}'",
        documents.len(),
        dir.display(),
        options.collection
    );

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let states = pipeline
        .ingest_all_with(&documents, &options, |state| {
            pb.set_message(state.document.clone());
            pb.inc(1);
        })
        .await?;
    pb.finish_with_message("done");

    if let Some(state) = states.last() {
        println!(
            "{} Collection '{}' now holds {} points",
            style("✓").green(),
            state.collection,
            state.info.points_count
        );
    }
    Ok(())
}

fn list_models(backend: Option<&str>, modality: Option<Modality>) -> anyhow::Result<()> {
    let backend = backend.map(|b| b.parse::<EmbeddingBackend>()).transpose()?;

    if modality != Some(Modality::Text) {
        println!("{}", style("Embedding models").bold());
        for model in EMBEDDING_MODELS
            .iter()
            .filter(|m| backend.map_or(true, |b| m.backend == b))
        {
            println!("  {:<45} {:<12} {} dims", model.name, model.backend.as_str(), model.dimensions);
        }
    }

    if modality != Some(Modality::Embedding) {
        println!("{}", style("Text models").bold());
        for (name, model_backend) in GENERATION_MODELS
            .iter()
            .filter(|(_, b)| backend.map_or(true, |wanted| b.as_str() == wanted.as_str()))
        {
            println!("  {:<45} {}", name, model_backend);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_accepts_snake_case_flags() {
        let cli = Cli::try_parse_from([
            "rag-qa",
            "ask",
            "--question",
            "What is AWS?",
            "--top_k",
            "50",
            "--top_p",
            "0.9",
            "--max_tokens",
            "120",
            "--collection_name",
            "cnu",
        ])
        .unwrap();

        match cli.command {
            Commands::Ask {
                top_k,
                top_p,
                max_tokens,
                collection_name,
                ..
            } => {
                assert_eq!(top_k, Some(50));
                assert_eq!(top_p, Some(0.9));
                assert_eq!(max_tokens, Some(120));
                assert_eq!(collection_name.as_deref(), Some("cnu"));
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_create_accepts_both_flag_spellings() {
        let cli = Cli::try_parse_from([
            "rag-qa",
            "create",
            "--chunk-size",
            "800",
            "--chunk_overlap",
            "50",
            "--force_recreate",
        ])
        .unwrap();

        match cli.command {
            Commands::Create {
                chunk_size,
                chunk_overlap,
                force_recreate,
                documents_dir,
                ..
            } => {
                assert_eq!(chunk_size, Some(800));
                assert_eq!(chunk_overlap, Some(50));
                assert!(force_recreate);
                assert!(documents_dir.is_none());
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_command_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
