use std::io::{BufRead, BufReader, Lines, Stdin};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::chat::{
    ChatClient, ChatSession, ContextRetriever, Conversation, ConversationTurn, SessionState,
    Speaker, TracingDiagnostics, TurnRenderer,
};
use crate::config::Config;
use crate::database::lancedb::VectorStore;
use crate::embeddings::OllamaClient;
use crate::ingest::{IngestMode, Ingestor};
use crate::{LawError, Result};

const RESET_COMMAND: &str = "/reset";
const EXIT_COMMANDS: [&str; 2] = ["/exit", "/quit"];

/// Chunk, embed and store a knowledge-base file
#[inline]
pub async fn ingest_knowledge_base(config: &Config, path: &Path, rebuild: bool) -> Result<()> {
    let mode = if rebuild {
        IngestMode::Rebuild
    } else {
        IngestMode::Append
    };

    let mut ingestor = Ingestor::new(config).await?;
    let stats = ingestor.ingest_file(path, mode).await?;
    let total = ingestor.store().count_embeddings().await?;

    println!("✅ Knowledge base ingested from {}", path.display());
    println!("  Records: {}", stats.records);
    println!("  Chunks stored: {}", stats.chunks);
    if stats.skipped_records > 0 {
        println!("  Skipped (empty description): {}", stats.skipped_records);
    }
    println!("  Entries in collection: {}", total);

    Ok(())
}

/// Wire the Ollama embedder, the vector store and the chat API into a session
///
/// Fails when the API key is missing, so the user finds out before typing.
#[inline]
pub async fn build_session(config: &Config, debug: bool, n_results: usize) -> Result<ChatSession> {
    let generator = ChatClient::new(&config.chat)?;
    let embedder = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    let store = VectorStore::new(config).await?;

    let mut retriever = ContextRetriever::new(store, Box::new(embedder));
    if debug || config.retrieval.debug {
        retriever = retriever.with_diagnostics(Box::new(TracingDiagnostics));
    }

    Ok(ChatSession::new(retriever, Box::new(generator)).with_n_results(n_results))
}

/// Renders turns on the terminal, with a spinner while the model works
struct ConsoleRenderer {
    spinner: Option<ProgressBar>,
    echo_user: bool,
    one_shot: bool,
}

impl ConsoleRenderer {
    fn interactive(echo_user: bool) -> Self {
        Self {
            spinner: None,
            echo_user,
            one_shot: false,
        }
    }

    fn one_shot() -> Self {
        Self {
            spinner: None,
            echo_user: false,
            one_shot: true,
        }
    }
}

impl TurnRenderer for ConsoleRenderer {
    fn render_turn(&mut self, turn: &ConversationTurn) {
        match turn.speaker {
            Speaker::You if self.echo_user => {
                println!("{} {}", style("You:").cyan().bold(), turn.message);
            }
            Speaker::You => {}
            Speaker::Bot if self.one_shot => println!("{}", turn.message),
            Speaker::Bot => {
                println!("{} {}", style("Bot:").green().bold(), turn.message);
                println!();
            }
        }
    }

    fn set_state(&mut self, state: SessionState) {
        match state {
            SessionState::Generating => {
                let spinner = if console::user_attended_stderr() {
                    let bar = ProgressBar::new_spinner().with_style(
                        ProgressStyle::with_template("{spinner} {msg}")
                            .expect("style template is valid"),
                    );
                    bar.set_message("Thinking...");
                    bar.enable_steady_tick(Duration::from_millis(100));
                    bar
                } else {
                    ProgressBar::hidden()
                };
                self.spinner = Some(spinner);
            }
            SessionState::Idle => {
                if let Some(spinner) = self.spinner.take() {
                    spinner.finish_and_clear();
                }
            }
        }
    }

    fn render_error(&mut self, error: &LawError) {
        // One-shot errors propagate to the exit status instead
        if !self.one_shot {
            println!("{} {}", style("Error:").red().bold(), error);
            println!();
        }
    }
}

/// Reads user lines from a prompt when attended, from stdin otherwise
enum InputSource {
    Prompt,
    Lines(Lines<BufReader<Stdin>>),
}

impl InputSource {
    fn detect() -> Self {
        if console::user_attended() {
            Self::Prompt
        } else {
            Self::Lines(BufReader::new(std::io::stdin()).lines())
        }
    }

    /// `None` at end of input
    fn next_line(&mut self) -> Option<String> {
        match self {
            Self::Prompt => Input::<String>::new()
                .with_prompt(style("You").cyan().bold().to_string())
                .allow_empty(true)
                .interact_text()
                .ok(),
            Self::Lines(lines) => lines.next().and_then(|line| line.ok()),
        }
    }
}

/// Interactive chat loop
#[inline]
pub async fn run_chat(config: &Config, debug: bool, n_results: usize) -> Result<()> {
    let mut session = build_session(config, debug, n_results).await?;

    if session.retriever().store().count_embeddings().await? == 0 {
        warn!("The knowledge base is empty");
        eprintln!(
            "{} The knowledge base is empty. Run 'law-u ingest <file>' first.",
            style("⚠️").yellow()
        );
    }

    eprintln!(
        "{}",
        style("⚖️  LAW-U - Legal Assistance for Indian Women's Rights")
            .bold()
            .cyan()
    );
    eprintln!("Ask any question related to women's legal rights in India.");
    eprintln!(
        "Type {} to start over, {} to leave.",
        style(RESET_COMMAND).bold(),
        style(EXIT_COMMANDS[0]).bold()
    );
    eprintln!();

    let mut input = InputSource::detect();
    let mut renderer = ConsoleRenderer::interactive(matches!(input, InputSource::Lines(_)));
    let mut conversation = Conversation::new();

    while let Some(line) = input.next_line() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if EXIT_COMMANDS.contains(&line) {
            break;
        }

        if line == RESET_COMMAND {
            conversation.reset();
            eprintln!("{}", style("Conversation cleared.").dim());
            continue;
        }

        if let Err(e) = session.submit(&mut conversation, line, &mut renderer).await {
            info!("Turn failed, continuing session: {}", e);
        }
    }

    info!("Chat session ended after {} turns", conversation.len());
    Ok(())
}

/// Answer a single question and print only the answer
#[inline]
pub async fn ask_question(
    config: &Config,
    question: &str,
    debug: bool,
    n_results: usize,
) -> Result<()> {
    let mut session = build_session(config, debug, n_results).await?;
    let mut conversation = Conversation::new();
    let mut renderer = ConsoleRenderer::one_shot();

    session
        .submit(&mut conversation, question.trim(), &mut renderer)
        .await?;

    Ok(())
}

/// Report configuration, backend reachability and collection size
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("📊 LAW-U Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("⚙️  Configuration:");
    println!("   Base directory: {}", config.get_base_dir().display());
    if config.config_file_path().exists() {
        println!("   ✅ Config file: {}", config.config_file_path().display());
    } else {
        println!("   ℹ️  Config file: not found, using defaults");
    }
    println!();

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
            }
            Err(e) => println!("   ⚠️  Ollama: Unavailable - {:#}", e),
        },
        Err(e) => println!("   ❌ Ollama: Invalid configuration - {:#}", e),
    }
    println!();

    println!("🔍 Vector Database Status:");
    match VectorStore::new(config).await {
        Ok(store) => {
            let healthy = store.validate_integrity().await.unwrap_or(false);
            let count = store.count_embeddings().await.unwrap_or(0);
            let marker = if healthy { "✅" } else { "⚠️ " };
            println!(
                "   {} LanceDB: {}",
                marker,
                config.vector_database_path().display()
            );
            println!("   📄 Stored chunks: {}", count);
            println!("   📐 Vector dimension: {}", store.vector_dimension());
        }
        Err(e) => println!("   ❌ LanceDB: Failed to open - {}", e),
    }
    println!();

    println!("💬 Chat API Status:");
    println!("   Endpoint: {}", config.chat.api_base);
    println!("   Model: {}", config.chat.model);
    if std::env::var(&config.chat.api_key_env).is_ok_and(|key| !key.trim().is_empty()) {
        println!("   ✅ API key: {} is set", config.chat.api_key_env);
    } else {
        println!("   ❌ API key: {} is not set", config.chat.api_key_env);
    }

    Ok(())
}
