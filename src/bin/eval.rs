//! Evaluation CLI: replay a fixture against the chatbot and score the answers.
//!
//! Usage:
//!   eval fixtures/tests.json                 # Call the running /chat endpoint
//!   eval fixtures/dontknow.json --in-process # Build the handler from config instead
//!
//! Options:
//!   --kind <answer|dont-know>                # Fixture kind (guessed from the file name)
//!   --policy <exact|contains|dont-know>      # Matching policy (default depends on kind)
//!   --phrases <path>                         # JSON list replacing the don't-know allow-list
//!   --endpoint <url>                         # Chat endpoint URL
//!   --judge                                  # Add LLM-as-judge star ratings
//!   --max-items <N>                          # Limit number of records
//!   --verbose                                # Print every record
//!   --output <path>                          # Save the report to a JSON file

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use rag_chatbot::chat::{ChatHandler, ChatService};
use rag_chatbot::config::Config;
use rag_chatbot::eval::{
    EvaluationReport, Evaluator, EvaluatorConfig, Fixture, FixtureKind, HttpChatClient, LlmJudge,
    MatchPolicy,
};
use rag_chatbot::llm::LlmClient;
use rag_chatbot::logging;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "eval")]
#[command(about = "Replay a question fixture against the chatbot", long_about = None)]
struct Cli {
    /// Path to the fixture JSON file
    fixture: PathBuf,

    /// Fixture kind (guessed from the file name when omitted)
    #[arg(long, value_enum)]
    kind: Option<FixtureKind>,

    /// Matching policy (contains for answer fixtures, dont-know otherwise)
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// JSON array of phrases replacing the don't-know allow-list
    #[arg(long)]
    phrases: Option<PathBuf>,

    /// Chat endpoint URL (defaults to the configured endpoint)
    #[arg(long, conflicts_with = "in_process")]
    endpoint: Option<String>,

    /// Build the chat handler in this process instead of calling an endpoint
    #[arg(long)]
    in_process: bool,

    /// Rate answers with the LLM judge
    #[arg(long)]
    judge: bool,

    /// Maximum number of records to evaluate
    #[arg(long)]
    max_items: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save the report to a JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Exact,
    Contains,
    DontKnow,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::load().context("Failed to load configuration")?;

    let fixture = Fixture::load(&cli.fixture, cli.kind)?;
    if fixture.is_empty() {
        tracing::warn!(fixture = %fixture.name, "fixture has no records; pass rate will be 0.0");
    }
    println!(
        "Fixture: {} ({} records, {:?})",
        fixture.name,
        fixture.len(),
        fixture.kind
    );

    let policy = build_policy(&cli, &config, fixture.kind)?;
    println!("Matching policy: {}", policy.name());

    let service: Arc<dyn ChatService> = if cli.in_process {
        config.validate().context("Invalid configuration")?;
        println!("Chat: in-process (model {})", config.llm.model);
        Arc::new(ChatHandler::from_config(&config))
    } else {
        let url = cli
            .endpoint
            .clone()
            .unwrap_or_else(|| config.eval.chat_endpoint.clone());
        println!("Chat endpoint: {}", url);
        Arc::new(HttpChatClient::new(url))
    };

    let mut evaluator = Evaluator::new(service, policy).with_config(EvaluatorConfig {
        max_items: cli.max_items,
        verbose: cli.verbose,
    });

    if cli.judge {
        config
            .validate_llm()
            .context("The judge needs LLM configuration")?;
        println!("Judge model: {}", config.llm.model);
        let judge_client = LlmClient::new(config.llm.clone());
        evaluator = evaluator.with_judge(LlmJudge::new(Arc::new(judge_client)));
    }

    let report: EvaluationReport = evaluator.run(&fixture).await;

    report.print_summary();

    if let Some(output_path) = cli.output {
        report.save_json(&output_path)?;
        println!("Results saved to {:?}", output_path);
    }

    Ok(())
}

/// Resolve the matching policy from flags, config and fixture kind.
fn build_policy(cli: &Cli, config: &Config, kind: FixtureKind) -> Result<MatchPolicy> {
    let custom_phrases = match &cli.phrases {
        Some(path) => Some(MatchPolicy::load_phrases(path)?),
        None => config.eval.dont_know_phrases.clone(),
    };

    let wants_dont_know = match cli.policy {
        Some(PolicyArg::Exact) => return Ok(MatchPolicy::Exact),
        Some(PolicyArg::Contains) => return Ok(MatchPolicy::Contains),
        Some(PolicyArg::DontKnow) => true,
        None => kind == FixtureKind::DontKnow,
    };

    if !wants_dont_know {
        return Ok(MatchPolicy::for_kind(kind));
    }

    Ok(match custom_phrases {
        Some(phrases) if !phrases.is_empty() => MatchPolicy::dont_know_with(phrases),
        Some(_) => bail!("The don't-know allow-list is empty"),
        None => MatchPolicy::dont_know(),
    })
}
