//! RAG Chatbot CLI
//!
//! Serves the chat endpoint, or answers a single question from the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rag_chatbot::{
    chat::{ChatHandler, ChatRequest},
    config::Config,
    llm::LlmClient,
    logging, server,
};
use std::time::Instant;

/// RAG Chatbot - retrieval-augmented answers from a hosted index and LLM
#[derive(Parser)]
#[command(name = "rag-chat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP chat service (POST /chat)
    Serve {
        /// Address to bind, e.g. 127.0.0.1:5000 (defaults to the configured address)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Answer one question and exit
    Ask {
        /// The question to ask
        question: String,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Serve { bind } => cmd_serve(bind).await,
        Commands::Ask { question, json } => cmd_ask(question, json).await,
        Commands::Test => cmd_test().await,
    }
}

fn load_config() -> Result<Config> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn cmd_serve(bind: Option<String>) -> Result<()> {
    let config = load_config()?;
    let addr = bind.unwrap_or_else(|| config.server.bind.clone());

    tracing::info!(model = %config.llm.model, index = %config.search.index, "starting chat service");
    server::serve(ChatHandler::from_config(&config), &addr).await
}

async fn cmd_ask(question: String, json: bool) -> Result<()> {
    let config = load_config()?;
    let handler = ChatHandler::from_config(&config);

    let start = Instant::now();
    let response = handler
        .handle(&ChatRequest::new(question))
        .await
        .context("Chat request failed")?;
    let duration = start.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", response.answer);
    println!();
    println!("{}", "─".repeat(60));
    if response.context.is_empty() {
        println!("No context retrieved.");
    } else {
        for (i, passage) in response.context.iter().enumerate() {
            match passage.score {
                Some(score) => println!("{:>2}. {} (score {:.3})", i + 1, passage.source, score),
                None => println!("{:>2}. {}", i + 1, passage.source),
            }
        }
    }
    println!("{}", "─".repeat(60));
    println!("Answered in {:.2?}", duration);

    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  API Base:    {}", config.llm.api_base);
    println!("  Model:       {}", config.llm.model);
    println!(
        "  API Version: {}",
        config.llm.api_version.as_deref().unwrap_or("(OpenAI style)")
    );
    println!(
        "  API Key:     {}...",
        config.llm.api_key.chars().take(8).collect::<String>()
    );
    println!();

    if let Err(e) = config.validate_llm() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = LlmClient::new(config.llm);

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(response) => {
            println!("Connection successful!");
            println!(
                "  Finish reason: {}",
                response.finish_reason.as_deref().unwrap_or("(none)")
            );
            if let Some(usage) = response.usage {
                println!(
                    "  Tokens: {} prompt + {} completion = {}",
                    usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
                );
            }
        }
        Err(e) => {
            println!("Connection failed: {}", e);
        }
    }

    Ok(())
}
