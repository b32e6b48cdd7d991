//! Chat service client for a running `/chat` endpoint.

use crate::chat::{ChatRequest, ChatResponse, ChatService};
use crate::error::{ChatError, ChatErrorKind};
use crate::llm::Message;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Outbound request body. The question is sent under both field names so
/// services reading the older `user_input` field get it too.
#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    question: &'a str,
    user_input: &'a str,
    #[serde(skip_serializing_if = "<[Message]>::is_empty")]
    history: &'a [Message],
}

impl<'a> From<&'a ChatRequest> for WireRequest<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            question: &request.question,
            user_input: &request.question,
            history: &request.history,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    kind: ChatErrorKind,
    message: String,
}

/// Calls a chat endpoint over HTTP.
#[derive(Clone)]
pub struct HttpChatClient {
    client: Client,
    url: String,
}

impl HttpChatClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    fn status_error(status: StatusCode, body: &str) -> ChatError {
        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
            return match parsed.error.kind {
                ChatErrorKind::InvalidRequest => ChatError::InvalidRequest(parsed.error.message),
                ChatErrorKind::ServiceUnavailable => {
                    ChatError::ServiceUnavailable(parsed.error.message)
                }
            };
        }

        let message = format!("chat endpoint returned {}: {}", status, body);
        if status.is_client_error() {
            ChatError::InvalidRequest(message)
        } else {
            ChatError::ServiceUnavailable(message)
        }
    }
}

#[async_trait]
impl ChatService for HttpChatClient {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WireRequest::from(request))
            .send()
            .await
            .map_err(|e| ChatError::ServiceUnavailable(format!("chat endpoint unreachable: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::ServiceUnavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::status_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            ChatError::ServiceUnavailable(format!("malformed chat response: {}", e))
        })
    }
}
