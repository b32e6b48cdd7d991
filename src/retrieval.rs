//! Context retrieval from a hosted search index.
//!
//! The chat handler only sees the `Retriever` trait. `SearchRetriever`
//! implements it with a hybrid (keyword + vector) query:
//! the user input is optionally rewritten into a search query by the LLM,
//! embedded, and sent to the index together with the text query.

use crate::config::SearchConfig;
use crate::error::{RagError, Result};
use crate::llm::{Generator, LlmClient, Prompts};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// A retrieved context passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Identifier of the source document (file name or document key).
    #[serde(alias = "filename")]
    pub source: String,
    /// Passage text.
    pub content: String,
    /// Relevance score reported by the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Passage {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            score: None,
        }
    }
}

/// Something that finds context passages for a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Fetch passages for `query`, most relevant first. An empty list is a
    /// valid answer.
    async fn fetch(&self, query: &str) -> Result<Vec<Passage>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    search: &'a str,
    top: usize,
    vector_queries: [VectorQuery<'a>; 1],
}

#[derive(Debug, Serialize)]
struct VectorQuery<'a> {
    kind: &'static str,
    vector: &'a [f32],
    k: usize,
    fields: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
    #[serde(default)]
    content: String,
    #[serde(rename = "@search.score", default)]
    score: Option<f64>,
}

/// Hybrid retriever over a hosted search index.
pub struct SearchRetriever {
    client: Client,
    config: SearchConfig,
    llm: LlmClient,
}

impl SearchRetriever {
    /// Create a retriever. `llm` is used for query rewriting and embeddings.
    pub fn new(config: SearchConfig, llm: LlmClient) -> Self {
        Self {
            client: Client::new(),
            config,
            llm,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.index,
            self.config.api_version
        )
    }

    /// Turn the user input into a search query.
    ///
    /// Falls back to the raw input when rewriting is disabled or the model
    /// returns nothing usable.
    async fn search_query(&self, user_input: &str) -> Result<String> {
        if !self.config.rewrite_query {
            return Ok(user_input.to_string());
        }

        let rewritten = self
            .llm
            .complete(Some(Prompts::query_translation()), user_input)
            .await?;
        let rewritten = Self::clean_query(&rewritten);

        if rewritten.is_empty() {
            Ok(user_input.to_string())
        } else {
            Ok(rewritten)
        }
    }

    /// Strip whitespace and wrapping quotes the model likes to add.
    fn clean_query(raw: &str) -> String {
        raw.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '`').trim().to_string()
    }

    async fn search(&self, query: &str, vector: &[f32]) -> Result<Vec<Passage>> {
        let request = SearchRequest {
            search: query,
            top: self.config.top,
            vector_queries: [VectorQuery {
                kind: "vector",
                vector,
                k: self.config.top,
                fields: &self.config.vector_field,
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RagError::RateLimited(body));
        }
        if status.is_server_error() {
            return Err(RagError::Upstream {
                status: status.as_u16(),
                message: body,
            });
        }
        if !status.is_success() {
            return Err(RagError::Search(format!("Request failed ({}): {}", status, body)));
        }

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| RagError::Search(format!("Failed to parse search response: {}", e)))?;

        Ok(parsed
            .value
            .into_iter()
            .map(|hit| Passage {
                source: hit.id,
                content: hit.content,
                score: hit.score,
            })
            .collect())
    }
}

#[async_trait]
impl Retriever for SearchRetriever {
    async fn fetch(&self, query: &str) -> Result<Vec<Passage>> {
        let search_query = self.search_query(query).await?;
        tracing::info!(%search_query, "searching index");

        let vector = self.llm.embed(&search_query).await?;
        let passages = self.search(&search_query, &vector).await?;

        for passage in &passages {
            tracing::debug!(source = %passage.source, score = ?passage.score, "retrieved passage");
        }
        Ok(passages)
    }
}
