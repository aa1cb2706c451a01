use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Config, LlmEndpoint, Provider};
use crate::error::{RagError, Result, Service};
use crate::http::{bearer_headers, HttpClient};

/// Turns text into fixed-length vectors. Used the same way for indexing and querying.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embeds a single question.
pub fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    embedder
        .embed(&[text.to_string()])?
        .into_iter()
        .next()
        .filter(|v| !v.is_empty())
        .ok_or(RagError::EmptyResponse {
            service: Service::Embedding,
        })
}

#[derive(Debug)]
pub struct HttpEmbedder {
    http: HttpClient,
    endpoint: LlmEndpoint,
    model: String,
}

impl HttpEmbedder {
    pub fn new(cfg: &Config, endpoint: LlmEndpoint) -> Result<Self> {
        let http = HttpClient::new(
            Service::Embedding,
            cfg.request_timeout,
            cfg.connect_timeout,
            bearer_headers(endpoint.api_key.as_deref())?,
        )?;
        Ok(Self {
            http,
            endpoint,
            model: cfg.embed_model.clone(),
        })
    }

    fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.endpoint.base_url);
        let req = OpenAiEmbedRequest {
            model: &self.model,
            input: texts,
        };
        let mut res = self.http.post_json::<OpenAiEmbedResponse, _>(&url, &req)?;
        res.data.sort_by_key(|d| d.index);
        Ok(res.data.into_iter().map(|d| d.embedding).collect())
    }

    fn embed_ollama(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.endpoint.base_url);
        let req = OllamaEmbedRequest {
            model: &self.model,
            input: texts,
        };
        match self.http.post_json::<Value, _>(&url, &req) {
            Ok(res) => parse_embeddings(&res),
            Err(err) if err.is_not_found() => {
                // Older Ollama servers only expose the single-prompt endpoint.
                tracing::debug!("falling back to legacy /api/embeddings");
                let url = format!("{}/api/embeddings", self.endpoint.base_url);
                texts
                    .iter()
                    .map(|text| {
                        let req = OllamaLegacyRequest {
                            model: &self.model,
                            prompt: text,
                        };
                        let res = self.http.post_json::<Value, _>(&url, &req)?;
                        parse_embeddings(&res)?.into_iter().next().ok_or(
                            RagError::EmptyResponse {
                                service: Service::Embedding,
                            },
                        )
                    })
                    .collect()
            }
            Err(err) => Err(err),
        }
    }
}

impl Embedder for HttpEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let vectors = match self.endpoint.provider {
            Provider::OpenAi => self.embed_openai(texts)?,
            Provider::Ollama => self.embed_ollama(texts)?,
        };
        if vectors.len() != texts.len() {
            return Err(RagError::Decode {
                service: Service::Embedding,
                message: format!("expected {} embeddings, got {}", texts.len(), vectors.len()),
            });
        }
        Ok(vectors)
    }
}

#[derive(Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Serialize)]
struct OllamaLegacyRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

fn parse_embeddings(value: &Value) -> Result<Vec<Vec<f32>>> {
    if let Some(embeddings) = value.get("embeddings") {
        return parse_embeddings_value(embeddings);
    }
    if let Some(embedding) = value.get("embedding") {
        return parse_embeddings_value(embedding);
    }
    Err(decode_error("no embeddings in response"))
}

fn parse_embeddings_value(value: &Value) -> Result<Vec<Vec<f32>>> {
    let arr = value
        .as_array()
        .ok_or_else(|| decode_error("embeddings are not an array"))?;
    if arr.is_empty() {
        return Ok(vec![]);
    }
    if arr[0].is_array() {
        return arr.iter().map(parse_vec).collect();
    }
    Ok(vec![parse_vec(value)?])
}

fn parse_vec(value: &Value) -> Result<Vec<f32>> {
    let arr = value
        .as_array()
        .ok_or_else(|| decode_error("embedding is not an array"))?;
    arr.iter()
        .map(|v| {
            v.as_f64()
                .map(|n| n as f32)
                .ok_or_else(|| decode_error("embedding value is not a number"))
        })
        .collect()
}

fn decode_error(message: &str) -> RagError {
    RagError::Decode {
        service: Service::Embedding,
        message: message.to_string(),
    }
}
