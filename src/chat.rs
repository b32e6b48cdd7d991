//! The chat handler: retrieve context, build a prompt, generate an answer.

use crate::config::Config;
use crate::error::ChatError;
use crate::llm::{Generator, LlmClient, Message, Prompts};
use crate::retrieval::{Passage, Retriever, SearchRetriever};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single chat turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question.
    #[serde(default, alias = "user_input")]
    pub question: String,
    /// Earlier turns of the conversation, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }
}

/// The generated answer and the passages it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(alias = "response")]
    pub answer: String,
    #[serde(default)]
    pub context: Vec<Passage>,
}

/// Anything that can answer a chat request: the in-process handler or a
/// remote chat endpoint.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError>;
}

/// Render passages as `source: content` lines.
pub fn format_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| format!("{}: {}", p.source, p.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the user turn sent to the generator.
pub fn build_prompt(question: &str, passages: &[Passage]) -> String {
    format!(
        "Context: {}\n\nUser Input: {}",
        format_context(passages),
        question
    )
}

/// Retrieval-augmented chat handler.
#[derive(Clone)]
pub struct ChatHandler {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
}

impl ChatHandler {
    /// Create a handler from already-built collaborators.
    pub fn new(retriever: Arc<dyn Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Wire the hosted LLM and search clients from configuration.
    pub fn from_config(config: &Config) -> Self {
        let llm = LlmClient::new(config.llm.clone());
        let retriever = SearchRetriever::new(config.search.clone(), llm.clone());
        Self::new(Arc::new(retriever), Arc::new(llm))
    }

    /// Answer one question.
    ///
    /// Empty questions are rejected before any service is called. Retrieval
    /// or generation failures become `ServiceUnavailable` and are not retried
    /// here.
    pub async fn handle(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(ChatError::InvalidRequest(
                "question must not be empty".to_string(),
            ));
        }
        tracing::info!(question, "handling chat request");

        let context = self.retriever.fetch(question).await.map_err(|e| {
            tracing::warn!(error = %e, "retrieval failed");
            ChatError::from(e)
        })?;
        if context.is_empty() {
            tracing::info!("no context retrieved; answering without it");
        }

        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(Message::system(Prompts::rag_system()));
        messages.extend(request.history.iter().cloned());
        messages.push(Message::user(build_prompt(question, &context)));

        let answer = self.generator.chat(messages).await.map_err(|e| {
            tracing::warn!(error = %e, "generation failed");
            ChatError::from(e)
        })?;

        Ok(ChatResponse { answer, context })
    }
}

#[async_trait]
impl ChatService for ChatHandler {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        self.handle(request).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{ChatErrorKind, RagError, Result};
    use crate::llm::Role;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Retriever returning fixed passages, or failing when `fail` is set.
    pub(crate) struct StubRetriever {
        pub passages: Vec<Passage>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    impl StubRetriever {
        pub fn with(passages: Vec<Passage>) -> Self {
            Self {
                passages,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                passages: Vec::new(),
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn fetch(&self, _query: &str) -> Result<Vec<Passage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RagError::Http("connection refused".to_string()));
            }
            Ok(self.passages.clone())
        }
    }

    /// Generator that records the conversations it receives.
    pub(crate) struct StubGenerator {
        pub reply: std::result::Result<String, String>,
        pub calls: AtomicUsize,
        pub seen: Mutex<Vec<Vec<Message>>>,
    }

    impl StubGenerator {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn rejecting(reason: &str) -> Self {
            Self {
                reply: Err(reason.to_string()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for StubGenerator {
        async fn chat(&self, messages: Vec<Message>) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(messages);
            self.reply.clone().map_err(RagError::ContentRejected)
        }
    }

    fn handler(retriever: &Arc<StubRetriever>, generator: &Arc<StubGenerator>) -> ChatHandler {
        ChatHandler::new(retriever.clone(), generator.clone())
    }

    #[test]
    fn test_build_prompt() {
        let passages = vec![
            Passage::new("geo.md", "Paris is the capital of France."),
            Passage::new("food.md", "Croissants."),
        ];
        assert_eq!(
            build_prompt("Capital?", &passages),
            "Context: geo.md: Paris is the capital of France.\nfood.md: Croissants.\n\nUser Input: Capital?"
        );
        assert_eq!(build_prompt("Capital?", &[]), "Context: \n\nUser Input: Capital?");
    }

    #[test]
    fn test_request_accepts_user_input_alias() {
        let request: ChatRequest = serde_json::from_str(r#"{"user_input": "hi"}"#).unwrap();
        assert_eq!(request.question, "hi");

        let missing: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(missing.question.is_empty());
    }

    #[test]
    fn test_response_accepts_response_alias() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"response": "Paris", "context": [{"filename": "a", "content": "b"}]}"#)
                .unwrap();
        assert_eq!(response.answer, "Paris");
        assert_eq!(response.context[0].source, "a");
    }

    #[tokio::test]
    async fn test_answers_with_context() {
        let retriever = Arc::new(StubRetriever::with(vec![Passage::new(
            "geo.md",
            "Paris is the capital of France.",
        )]));
        let generator = Arc::new(StubGenerator::replying("Paris"));

        let response = handler(&retriever, &generator)
            .handle(&ChatRequest::new("  What is the capital of France?  "))
            .await
            .unwrap();

        assert_eq!(response.answer, "Paris");
        assert_eq!(response.context.len(), 1);

        let seen = generator.seen.lock().unwrap();
        let messages = &seen[0];
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.starts_with("Context: geo.md: Paris"));
        assert!(messages[1].content.ends_with("User Input: What is the capital of France?"));
    }

    #[tokio::test]
    async fn test_empty_question_calls_nothing() {
        let retriever = Arc::new(StubRetriever::with(Vec::new()));
        let generator = Arc::new(StubGenerator::replying("unused"));
        let chat = handler(&retriever, &generator);

        for question in ["", "   \n\t"] {
            let err = chat.handle(&ChatRequest::new(question)).await.unwrap_err();
            assert_eq!(err.kind(), ChatErrorKind::InvalidRequest);
        }

        assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_retrieval_still_generates() {
        let retriever = Arc::new(StubRetriever::with(Vec::new()));
        let generator = Arc::new(StubGenerator::replying("I don't know"));

        let response = handler(&retriever, &generator)
            .handle(&ChatRequest::new("Unladen swallow airspeed?"))
            .await
            .unwrap();

        assert_eq!(response.answer, "I don't know");
        assert!(response.context.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retriever_failure_is_service_unavailable() {
        let retriever = Arc::new(StubRetriever::failing());
        let generator = Arc::new(StubGenerator::replying("unused"));

        let err = handler(&retriever, &generator)
            .handle(&ChatRequest::new("anything"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ChatErrorKind::ServiceUnavailable);
        assert!(err.reason().contains("connection refused"));
        assert_eq!(retriever.calls.load(Ordering::SeqCst), 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generator_failure_is_service_unavailable() {
        let retriever = Arc::new(StubRetriever::with(Vec::new()));
        let generator = Arc::new(StubGenerator::rejecting("policy"));

        let err = handler(&retriever, &generator)
            .handle(&ChatRequest::new("anything"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ChatErrorKind::ServiceUnavailable);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_history_goes_between_system_and_question() {
        let retriever = Arc::new(StubRetriever::with(Vec::new()));
        let generator = Arc::new(StubGenerator::replying("ok"));
        let request = ChatRequest::new("and Germany?").with_history(vec![
            Message::user("Capital of France?"),
            Message::assistant("Paris"),
        ]);

        handler(&retriever, &generator).ask(&request).await.unwrap();

        let seen = generator.seen.lock().unwrap();
        let roles: Vec<Role> = seen[0].iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert!(seen[0][3].content.ends_with("User Input: and Germany?"));
    }
}
