use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{RagError, Result};

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Ollama,
}

impl Provider {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

/// Where embedding and generation requests go, and with which credential.
#[derive(Clone)]
pub struct LlmEndpoint {
    pub provider: Provider,
    pub base_url: String,
    pub api_key: Option<String>,
}

impl fmt::Debug for LlmEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmEndpoint")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone)]
pub struct Config {
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub ollama_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub collection: String,
    pub distance: String,
    pub top_k: usize,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub index_batch: usize,
    pub catalog_paths: Vec<PathBuf>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("openai_api_key", &redacted(&self.openai_api_key))
            .field("embed_model", &self.embed_model)
            .field("chat_model", &self.chat_model)
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_api_key", &redacted(&self.qdrant_api_key))
            .field("collection", &self.collection)
            .field("top_k", &self.top_k)
            .field("catalog_paths", &self.catalog_paths)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Self {
        // A missing .env is fine.
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup. Unknown providers and
    /// unparseable numbers fall back to their defaults.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let provider = var("LLM_PROVIDER")
            .and_then(|v| Provider::parse(&v))
            .unwrap_or(Provider::OpenAi);
        let (default_embed, default_chat) = match provider {
            Provider::OpenAi => ("text-embedding-3-small", "gpt-3.5-turbo"),
            Provider::Ollama => ("nomic-embed-text", "llama3.1"),
        };

        Self {
            provider,
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            ollama_url: var("OLLAMA_URL").unwrap_or_else(|| "http://localhost:11434".to_string()),
            embed_model: var("EMBED_MODEL").unwrap_or_else(|| default_embed.to_string()),
            chat_model: var("CHAT_MODEL").unwrap_or_else(|| default_chat.to_string()),
            qdrant_url: var("QDRANT_URL").unwrap_or_else(|| "http://localhost:6333".to_string()),
            qdrant_api_key: var("QDRANT_API_KEY"),
            collection: var("QDRANT_COLLECTION").unwrap_or_else(|| "uwm_courses".to_string()),
            distance: var("QDRANT_DISTANCE").unwrap_or_else(|| "Cosine".to_string()),
            top_k: var("RAG_TOP_K")
                .and_then(|v| v.parse().ok())
                .filter(|k| *k > 0)
                .unwrap_or(DEFAULT_TOP_K),
            temperature: var("RAG_TEMPERATURE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TEMPERATURE),
            request_timeout: Duration::from_secs(
                var("RAG_REQUEST_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
            connect_timeout: Duration::from_secs(
                var("RAG_CONNECT_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
            index_batch: var("RAG_INDEX_BATCH")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(32),
            catalog_paths: var("CATALOG_PATHS")
                .unwrap_or_else(|| {
                    "data/course_catalog_template.csv,course_catalog_template.csv".to_string()
                })
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect(),
        }
    }

    /// Resolves the embedding/generation endpoint. A missing OpenAI key is fatal.
    pub fn llm_endpoint(&self) -> Result<LlmEndpoint> {
        match self.provider {
            Provider::OpenAi => {
                let api_key = self.openai_api_key.clone().ok_or_else(|| {
                    RagError::Config(
                        "OPENAI_API_KEY is not set; put it in .env or the environment".to_string(),
                    )
                })?;
                Ok(LlmEndpoint {
                    provider: Provider::OpenAi,
                    base_url: self.openai_base_url.trim_end_matches('/').to_string(),
                    api_key: Some(api_key),
                })
            }
            Provider::Ollama => Ok(LlmEndpoint {
                provider: Provider::Ollama,
                base_url: self.ollama_url.trim_end_matches('/').to_string(),
                api_key: None,
            }),
        }
    }
}
