use std::path::PathBuf;

use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use law_u::Result;
use law_u::commands::{ask_question, ingest_knowledge_base, run_chat, show_status};
use law_u::config::{Config, get_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "law-u")]
#[command(about = "Legal assistance chatbot for Indian women's rights, backed by a local knowledge base")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the vector database (default ~/.law-u)
    #[arg(long, global = true, env = "LAW_U_HOME")]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the Ollama connection and chat model
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Chunk, embed and store a JSON knowledge base
    Ingest {
        /// JSON file containing an array of legal-topic records
        path: PathBuf,
        /// Clear the collection before ingesting
        #[arg(long)]
        rebuild: bool,
    },
    /// Start an interactive chat session
    Chat {
        /// Log every retrieved chunk with its distance
        #[arg(long)]
        debug: bool,
        /// Number of chunks retrieved per question
        #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..=50))]
        results: Option<usize>,
    },
    /// Ask a single question and print the answer
    Ask {
        question: String,
        /// Log every retrieved chunk with its distance
        #[arg(long)]
        debug: bool,
        /// Number of chunks retrieved per question
        #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..=50))]
        results: Option<usize>,
    },
    /// Show configuration and backend status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&Config::load(&base_dir)?)?;
            } else {
                run_interactive_config(&base_dir)?;
            }
        }
        Commands::Ingest { path, rebuild } => {
            let config = Config::load(&base_dir)?;
            ingest_knowledge_base(&config, &path, rebuild).await?;
        }
        Commands::Chat { debug, results } => {
            let config = Config::load(&base_dir)?;
            let n_results = results.unwrap_or(config.retrieval.n_results);
            run_chat(&config, debug, n_results).await?;
        }
        Commands::Ask {
            question,
            debug,
            results,
        } => {
            let config = Config::load(&base_dir)?;
            let n_results = results.unwrap_or(config.retrieval.n_results);
            ask_question(&config, &question, debug, n_results).await?;
        }
        Commands::Status => {
            let config = Config::load(&base_dir)?;
            show_status(&config).await?;
        }
    }

    Ok(())
}
