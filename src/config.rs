//! Configuration for the chatbot and evaluator.
//!
//! Supports a YAML config file, a `.env` file and environment variables.
//! Environment variables take precedence over config file values.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// API version used when an Azure OpenAI endpoint is configured without one.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-05-01-preview";

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com" or an Azure resource endpoint)
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name, or deployment name when `api_version` is set
    pub model: String,

    /// Azure OpenAI API version. When set, Azure-style routes and the
    /// `api-key` header are used.
    #[serde(default)]
    pub api_version: Option<String>,

    /// Model or deployment used for query embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Maximum tokens for response (unset means the service default)
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Extra attempts after a retryable failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_retries() -> u32 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: String::new(),
            api_version: None,
            embedding_model: default_embedding_model(),
            max_tokens: None,
            temperature: default_temperature(),
            max_retries: default_max_retries(),
        }
    }
}

/// Hosted search index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search service endpoint (e.g., "https://my-search.search.windows.net")
    pub endpoint: String,

    /// Query key for the search service
    pub api_key: String,

    /// Index name
    pub index: String,

    #[serde(default = "default_search_api_version")]
    pub api_version: String,

    /// Number of passages to retrieve
    #[serde(default = "default_top")]
    pub top: usize,

    /// Index field holding the content vectors
    #[serde(default = "default_vector_field")]
    pub vector_field: String,

    /// Rewrite the user input into a search query with the LLM first
    #[serde(default = "default_rewrite_query")]
    pub rewrite_query: bool,
}

fn default_search_api_version() -> String {
    "2023-11-01".to_string()
}

fn default_top() -> usize {
    3
}

fn default_vector_field() -> String {
    "contentVector".to_string()
}

fn default_rewrite_query() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            index: String::new(),
            api_version: default_search_api_version(),
            top: default_top(),
            vector_field: default_vector_field(),
            rewrite_query: default_rewrite_query(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

/// Evaluator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// URL of the chat route the evaluator calls over HTTP
    pub chat_endpoint: String,

    /// Replacement allow-list for the don't-know matching policy
    #[serde(default)]
    pub dont_know_phrases: Option<Vec<String>>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            chat_endpoint: "http://localhost:5000/chat".to_string(),
            dont_know_phrases: None,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM settings
    pub llm: LlmConfig,
    /// Search index settings
    pub search: SearchConfig,
    /// HTTP server settings
    pub server: ServerConfig,
    /// Evaluator settings
    pub eval: EvalConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    search: Option<SearchFileSection>,
    server: Option<ServerFileSection>,
    eval: Option<EvalFileSection>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    api_version: Option<String>,
    embedding_model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    max_retries: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SearchFileSection {
    endpoint: Option<String>,
    api_key: Option<String>,
    index: Option<String>,
    api_version: Option<String>,
    top: Option<usize>,
    vector_field: Option<String>,
    rewrite_query: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ServerFileSection {
    bind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvalFileSection {
    chat_endpoint: Option<String>,
    dont_know_phrases: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (a `.env` file in the working directory is loaded first)
    /// 2. Config file (~/.config/rag-chatbot/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        Self::check_env_file(dotenvy::dotenv())?;

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// A missing `.env` is the normal case outside development; a broken
    /// one is a configuration error.
    fn check_env_file<T>(loaded: std::result::Result<T, dotenvy::Error>) -> Result<()> {
        match loaded {
            Ok(_) => Ok(()),
            Err(e) if e.not_found() => Ok(()),
            Err(e) => Err(RagError::Config(format!("Failed to load .env file: {}", e))),
        }
    }

    /// Override values from an environment lookup.
    ///
    /// Both the generic `LLM_*` names and the Azure `AOAI_*` names are
    /// accepted; the generic name wins when both are present.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|&key| var(key));

        if let Some(endpoint) = var("AOAI_ENDPOINT") {
            self.llm.api_base = endpoint;
            if self.llm.api_version.is_none() {
                self.llm.api_version = Some(DEFAULT_AZURE_API_VERSION.to_string());
            }
        }
        if let Some(api_base) = var("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }
        if let Some(api_key) = first(&["LLM_API_KEY", "AOAI_KEY"]) {
            self.llm.api_key = api_key;
        }
        if let Some(model) = first(&["LLM_MODEL", "AOAI_DEPLOYMENT"]) {
            self.llm.model = model;
        }
        if let Some(version) = first(&["LLM_API_VERSION", "AOAI_API_VERSION"]) {
            self.llm.api_version = Some(version);
        }
        if let Some(embedding_model) = first(&["LLM_EMBEDDING_MODEL", "AOAI_EMBEDDING_DEPLOYMENT"]) {
            self.llm.embedding_model = embedding_model;
        }
        if let Some(max_tokens) = var("LLM_MAX_TOKENS") {
            if let Ok(tokens) = max_tokens.parse() {
                self.llm.max_tokens = Some(tokens);
            }
        }
        if let Some(temperature) = var("LLM_TEMPERATURE") {
            if let Ok(temp) = temperature.parse() {
                self.llm.temperature = temp;
            }
        }

        if let Some(endpoint) = var("AZURE_SEARCH_ENDPOINT") {
            self.search.endpoint = endpoint;
        }
        if let Some(api_key) = var("AZURE_SEARCH_KEY") {
            self.search.api_key = api_key;
        }
        if let Some(index) = var("AZURE_SEARCH_INDEX") {
            self.search.index = index;
        }

        if let Some(bind) = var("CHAT_BIND_ADDR") {
            self.server.bind = bind;
        }
        if let Some(url) = var("CHAT_API_URL") {
            self.eval.chat_endpoint = url;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text, filling gaps with defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| RagError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if llm.api_version.is_some() {
                config.llm.api_version = llm.api_version;
            }
            if let Some(embedding_model) = llm.embedding_model {
                config.llm.embedding_model = embedding_model;
            }
            if llm.max_tokens.is_some() {
                config.llm.max_tokens = llm.max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
            if let Some(max_retries) = llm.max_retries {
                config.llm.max_retries = max_retries;
            }
        }

        if let Some(search) = file_config.search {
            if let Some(endpoint) = search.endpoint {
                config.search.endpoint = endpoint;
            }
            if let Some(api_key) = search.api_key {
                config.search.api_key = api_key;
            }
            if let Some(index) = search.index {
                config.search.index = index;
            }
            if let Some(api_version) = search.api_version {
                config.search.api_version = api_version;
            }
            if let Some(top) = search.top {
                config.search.top = top;
            }
            if let Some(vector_field) = search.vector_field {
                config.search.vector_field = vector_field;
            }
            if let Some(rewrite_query) = search.rewrite_query {
                config.search.rewrite_query = rewrite_query;
            }
        }

        if let Some(bind) = file_config.server.and_then(|s| s.bind) {
            config.server.bind = bind;
        }

        if let Some(eval) = file_config.eval {
            if let Some(chat_endpoint) = eval.chat_endpoint {
                config.eval.chat_endpoint = chat_endpoint;
            }
            if eval.dont_know_phrases.is_some() {
                config.eval.dont_know_phrases = eval.dont_know_phrases;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rag-chatbot")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that the LLM settings are present.
    pub fn validate_llm(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(RagError::Config(
                "LLM API base URL is required. Set LLM_API_BASE (or AOAI_ENDPOINT) or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(RagError::Config(
                "LLM API key is required. Set LLM_API_KEY (or AOAI_KEY) or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(RagError::Config(
                "LLM model is required. Set LLM_MODEL (or AOAI_DEPLOYMENT) or add to config file."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Validate that the search settings are present.
    pub fn validate_search(&self) -> Result<()> {
        if self.search.endpoint.is_empty() {
            return Err(RagError::Config(
                "Search endpoint is required. Set AZURE_SEARCH_ENDPOINT or add to config file."
                    .to_string(),
            ));
        }

        if self.search.api_key.is_empty() {
            return Err(RagError::Config(
                "Search API key is required. Set AZURE_SEARCH_KEY or add to config file."
                    .to_string(),
            ));
        }

        if self.search.index.is_empty() {
            return Err(RagError::Config(
                "Search index is required. Set AZURE_SEARCH_INDEX or add to config file."
                    .to_string(),
            ));
        }

        if self.search.top == 0 {
            return Err(RagError::Config("search.top must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Validate everything the chat handler needs.
    pub fn validate(&self) -> Result<()> {
        self.validate_llm()?;
        self.validate_search()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.llm.api_base.is_empty());
        assert!(config.llm.api_version.is_none());
        assert_eq!(config.llm.embedding_model, "text-embedding-ada-002");
        assert_eq!(config.llm.max_tokens, None);
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.llm.max_retries, 2);
        assert_eq!(config.search.top, 3);
        assert_eq!(config.search.vector_field, "contentVector");
        assert!(config.search.rewrite_query);
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert_eq!(config.eval.chat_endpoint, "http://localhost:5000/chat");
    }

    #[test]
    fn test_validate_fails_without_required_fields() {
        let config = Config::default();
        assert!(config.validate_llm().is_err());
        assert!(config.validate_search().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_file_errors() {
        let dir = tempfile::TempDir::new().unwrap();

        let missing = dotenvy::from_path(dir.path().join(".env"));
        assert!(Config::check_env_file(missing).is_ok());

        let broken = dir.path().join("broken.env");
        std::fs::write(&broken, "RAG_CHATBOT_TEST_KEY=\"unterminated\n").unwrap();
        let err = Config::check_env_file(dotenvy::from_path(&broken)).unwrap_err();
        assert!(matches!(err, RagError::Config(msg) if msg.contains(".env")));
    }

    #[test]
    fn test_azure_env_selects_api_version() {
        let mut config = Config::default();
        config.apply_env(lookup(&[
            ("AOAI_ENDPOINT", "https://res.openai.azure.com"),
            ("AOAI_KEY", "k"),
            ("AOAI_DEPLOYMENT", "gpt-4o"),
            ("AZURE_SEARCH_ENDPOINT", "https://s.search.windows.net"),
            ("AZURE_SEARCH_KEY", "sk"),
            ("AZURE_SEARCH_INDEX", "docs"),
        ]));

        assert_eq!(config.llm.api_base, "https://res.openai.azure.com");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_version.as_deref(), Some(DEFAULT_AZURE_API_VERSION));
        assert_eq!(config.search.index, "docs");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generic_env_wins_over_azure_names() {
        let mut config = Config::default();
        config.apply_env(lookup(&[
            ("LLM_MODEL", "generic"),
            ("AOAI_DEPLOYMENT", "azure"),
            ("LLM_TEMPERATURE", "0.5"),
            ("LLM_MAX_TOKENS", "not-a-number"),
        ]));

        assert_eq!(config.llm.model, "generic");
        assert_eq!(config.llm.temperature, 0.5);
        assert_eq!(config.llm.max_tokens, None);
        assert!(config.llm.api_version.is_none());
    }

    #[test]
    fn test_from_yaml_partial_sections() {
        let yaml = r#"
llm:
  api_base: https://api.example.com
  max_tokens: 512
search:
  top: 5
  rewrite_query: false
eval:
  dont_know_phrases: ["no idea"]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.llm.api_base, "https://api.example.com");
        assert_eq!(config.llm.max_tokens, Some(512));
        assert_eq!(config.search.top, 5);
        assert!(!config.search.rewrite_query);
        assert_eq!(config.search.vector_field, "contentVector");
        assert_eq!(
            config.eval.dont_know_phrases,
            Some(vec!["no idea".to_string()])
        );
    }

    #[test]
    fn test_from_yaml_rejects_garbage() {
        assert!(matches!(
            Config::from_yaml("llm: [unclosed"),
            Err(RagError::Config(_))
        ));
    }
}
