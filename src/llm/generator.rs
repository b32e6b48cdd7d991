//! The text-generation capability the chat handler depends on.

use super::client::Message;
use crate::error::Result;
use async_trait::async_trait;

/// Something that turns a conversation into a reply.
///
/// `LlmClient` is the hosted implementation; tests substitute stubs.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Send a full conversation and return the reply text.
    async fn chat(&self, messages: Vec<Message>) -> Result<String>;

    /// Single user message with optional system prompt.
    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);

        if let Some(sys) = system {
            messages.push(Message::system(sys));
        }
        messages.push(Message::user(user));

        self.chat(messages).await
    }
}
