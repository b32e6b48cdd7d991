//! RAG Chatbot - retrieval-augmented question answering over hosted services.
//!
//! A question is answered by fetching context passages from a search index
//! and asking a hosted language model to answer from that context only.
//! An evaluator replays fixed question sets against the chatbot and scores
//! the answers.
//!
//! # Quick Start
//!
//! ```no_run
//! use rag_chatbot::{
//!     chat::{ChatHandler, ChatRequest},
//!     config::Config,
//!     eval::{Evaluator, Fixture, MatchPolicy},
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     // Ask one question
//!     let handler = ChatHandler::from_config(&config);
//!     let response = handler.handle(&ChatRequest::new("What is the capital of France?")).await?;
//!     println!("{}", response.answer);
//!
//!     // Replay a fixture against the same handler
//!     let fixture = Fixture::load(Path::new("fixtures/tests.json"), None)?;
//!     let evaluator = Evaluator::new(Arc::new(handler), MatchPolicy::for_kind(fixture.kind));
//!     let report = evaluator.run(&fixture).await;
//!     report.print_summary();
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Retriever**: fetches context passages (`SearchRetriever` for a hosted index)
//! - **Generator**: produces text from a conversation (`LlmClient`)
//! - **ChatHandler**: validates, retrieves, prompts and generates
//! - **Evaluator**: replays a `Fixture` through any `ChatService`

pub mod chat;
pub mod config;
pub mod error;
pub mod eval;
pub mod llm;
pub mod logging;
pub mod retrieval;
pub mod server;

// Re-export commonly used types
pub use chat::{ChatHandler, ChatRequest, ChatResponse, ChatService};
pub use config::Config;
pub use error::{ChatError, ChatErrorKind, RagError, Result};
pub use llm::{Generator, LlmClient};
pub use retrieval::{Passage, Retriever, SearchRetriever};
