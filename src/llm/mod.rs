//! LLM integration module.
//!
//! Provides the `Generator` capability, an OpenAI-compatible client
//! implementing it, and the prompts used for chat and judging.

mod client;
mod generator;
mod prompts;

pub use client::{LlmClient, LlmResponse, Message, Role, TokenUsage};
pub use generator::Generator;
pub use prompts::Prompts;
