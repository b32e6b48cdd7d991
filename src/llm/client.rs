//! OpenAI-compatible LLM client.
//!
//! Works with any OpenAI-compatible endpoint and with Azure OpenAI
//! deployments (selected by setting `api_version` in the config).

use super::generator::Generator;
use crate::config::LlmConfig;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// First backoff delay; doubles per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request body for chat completion.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
}

/// Response from chat completion.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Response from an LLM call including metadata.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated content.
    pub content: String,
    /// Reason the model stopped generating.
    pub finish_reason: Option<String>,
    /// Token usage (if available).
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// OpenAI-compatible LLM client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Build the URL for an operation (`chat/completions`, `embeddings`)
    /// against a model or deployment.
    fn url(&self, operation: &str, deployment: &str) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        match &self.config.api_version {
            Some(version) => format!(
                "{}/openai/deployments/{}/{}?api-version={}",
                base, deployment, operation, version
            ),
            None => format!("{}/v1/{}", base, operation),
        }
    }

    /// Get the chat completion endpoint URL.
    fn endpoint(&self) -> String {
        self.url("chat/completions", &self.config.model)
    }

    fn embeddings_endpoint(&self) -> String {
        self.url("embeddings", &self.config.embedding_model)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.config.api_version.is_some() {
            request.header("api-key", &self.config.api_key)
        } else {
            request.header("Authorization", format!("Bearer {}", self.config.api_key))
        }
    }

    /// Run `call` until it succeeds, fails for good, or runs out of retries.
    async fn with_retries<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    tracing::warn!(operation, attempt = attempt + 1, ?delay, error = %err, "retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Send a chat completion request, retrying transient failures.
    pub async fn chat_completion(&self, messages: &[Message]) -> Result<LlmResponse> {
        self.with_retries("chat completion", || self.chat_once(messages)).await
    }

    async fn chat_once(&self, messages: &[Message]) -> Result<LlmResponse> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .authorize(self.client.post(self.endpoint()))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::status_error(status, &body));
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body)?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RagError::LlmApi("No choices in response".to_string()))?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(RagError::ContentRejected(
                "completion was filtered by the content policy".to_string(),
            ));
        }

        let content = choice
            .message
            .content
            .ok_or_else(|| RagError::LlmParse("Completion has no content".to_string()))?;

        if let Some(usage) = &completion.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }

        Ok(LlmResponse {
            content,
            finish_reason: choice.finish_reason,
            usage: completion.usage,
        })
    }

    /// Map a non-success response onto the error taxonomy.
    fn status_error(status: StatusCode, body: &str) -> RagError {
        let detail = serde_json::from_str::<ApiError>(body).ok().map(|e| e.error);
        let message = detail
            .as_ref()
            .map(|d| d.message.clone())
            .unwrap_or_else(|| body.to_string());

        if status == StatusCode::TOO_MANY_REQUESTS {
            return RagError::RateLimited(message);
        }
        if detail.and_then(|d| d.code).as_deref() == Some("content_filter") {
            return RagError::ContentRejected(message);
        }
        if status.is_server_error() {
            return RagError::Upstream {
                status: status.as_u16(),
                message,
            };
        }
        RagError::LlmApi(format!("API error ({}): {}", status, message))
    }

    /// Embed a single text with the configured embedding model, retrying
    /// transient failures.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.with_retries("embedding", || self.embed_once(text)).await
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: [text],
        };

        let response = self
            .authorize(self.client.post(self.embeddings_endpoint()))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::status_error(status, &body));
        }

        let embeddings: EmbeddingResponse = serde_json::from_str(&body)?;
        embeddings
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagError::LlmApi("No embedding in response".to_string()))
    }

    /// Test connectivity to the API. Returns the probe response.
    pub async fn test_connection(&self) -> Result<LlmResponse> {
        let messages = vec![Message::user("Say 'hello' and nothing else.")];

        let response = self.chat_completion(&messages).await?;

        if response.content.to_lowercase().contains("hello") {
            Ok(response)
        } else {
            Err(RagError::LlmApi(format!(
                "Unexpected response: {}",
                response.content
            )))
        }
    }
}

#[async_trait]
impl Generator for LlmClient {
    async fn chat(&self, messages: Vec<Message>) -> Result<String> {
        Ok(self.chat_completion(&messages).await?.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn completion_body(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"content": content}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        })
        .to_string()
    }

    fn config_for(base: &str) -> LlmConfig {
        LlmConfig {
            api_base: base.to_string(),
            api_key: "test".to_string(),
            model: "gpt-4".to_string(),
            max_retries: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_message_creation() {
        let sys = Message::system("You are helpful.");
        let user = Message::user("Hello!");
        let assistant = Message::assistant("Hi there!");

        assert_eq!(sys.role, Role::System);
        assert_eq!(user.role, Role::User);
        assert_eq!(assistant.role, Role::Assistant);
    }

    #[test]
    fn test_endpoint_construction() {
        let client = LlmClient::new(config_for("https://api.example.com/"));
        assert_eq!(client.endpoint(), "https://api.example.com/v1/chat/completions");
        assert_eq!(client.embeddings_endpoint(), "https://api.example.com/v1/embeddings");

        let mut azure = config_for("https://res.openai.azure.com");
        azure.api_version = Some("2024-05-01-preview".to_string());
        let client = LlmClient::new(azure);
        assert_eq!(
            client.endpoint(),
            "https://res.openai.azure.com/openai/deployments/gpt-4/chat/completions?api-version=2024-05-01-preview"
        );
        assert_eq!(
            client.embeddings_endpoint(),
            "https://res.openai.azure.com/openai/deployments/text-embedding-ada-002/embeddings?api-version=2024-05-01-preview"
        );
    }

    #[tokio::test]
    async fn test_complete_sends_system_and_user() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ]
            })))
            .with_status(200)
            .with_body(completion_body("hello"))
            .create_async()
            .await;

        let client = LlmClient::new(config_for(&server.url()));
        let reply = client.complete(Some("be brief"), "hi").await.unwrap();

        assert_eq!(reply, "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_azure_uses_api_key_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/deployments/gpt-4/chat/completions")
            .match_query(Matcher::UrlEncoded(
                "api-version".into(),
                "2024-05-01-preview".into(),
            ))
            .match_header("api-key", "test")
            .with_status(200)
            .with_body(completion_body("hello"))
            .create_async()
            .await;

        let mut config = config_for(&server.url());
        config.api_version = Some("2024-05-01-preview".to_string());
        let client = LlmClient::new(config);

        let response = client.test_connection().await.unwrap();
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(12));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_and_content_filter_mapping() {
        let mut server = mockito::Server::new_async().await;
        let _limited = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::Regex("limited".into()))
            .with_status(429)
            .with_body(r#"{"error": {"message": "slow down"}}"#)
            .create_async()
            .await;
        let _filtered = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::Regex("filtered".into()))
            .with_status(400)
            .with_body(r#"{"error": {"message": "blocked", "code": "content_filter"}}"#)
            .create_async()
            .await;

        let client = LlmClient::new(config_for(&server.url()));

        let err = client.complete(None, "limited").await.unwrap_err();
        assert!(matches!(err, RagError::RateLimited(msg) if msg == "slow down"));

        let err = client.complete(None, "filtered").await.unwrap_err();
        assert!(matches!(err, RagError::ContentRejected(_)));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .expect(2)
            .create_async()
            .await;

        let mut config = config_for(&server.url());
        config.max_retries = 1;
        let client = LlmClient::new(config);

        let err = client.complete(None, "hi").await.unwrap_err();
        assert!(matches!(err, RagError::Upstream { status: 503, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embedding_server_errors_are_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(503)
            .with_body("overloaded")
            .expect(2)
            .create_async()
            .await;

        let mut config = config_for(&server.url());
        config.max_retries = 1;
        let client = LlmClient::new(config);

        let err = client.embed("paris").await.unwrap_err();
        assert!(matches!(err, RagError::Upstream { status: 503, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_returns_first_vector() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "text-embedding-ada-002",
                "input": ["paris"]
            })))
            .with_status(200)
            .with_body(r#"{"data": [{"embedding": [0.1, 0.2, 0.3]}]}"#)
            .create_async()
            .await;

        let client = LlmClient::new(config_for(&server.url()));
        let vector = client.embed("paris").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }
}
