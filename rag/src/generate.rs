use serde::{Deserialize, Serialize};

use crate::build_prompt::{build_grounded_prompt, Message, REFUSAL};
use crate::config::{Config, LlmEndpoint, Provider};
use crate::error::{RagError, Result, Service};
use crate::http::{bearer_headers, HttpClient};
use crate::retrieve_courses::RetrievedDocument;

pub trait ChatModel: Send + Sync {
    fn chat(&self, messages: &[Message], temperature: f32) -> Result<String>;
}

/// Answers `question` from `documents` only. With no documents the refusal is
/// returned without calling the model.
pub fn generate_answer(
    model: &dyn ChatModel,
    question: &str,
    documents: &[RetrievedDocument],
    temperature: f32,
) -> Result<String> {
    if documents.is_empty() {
        tracing::debug!("no retrieved context, refusing without a model call");
        return Ok(REFUSAL.to_string());
    }
    let messages = build_grounded_prompt(question, documents);
    model.chat(&messages, temperature)
}

#[derive(Debug)]
pub struct HttpChatModel {
    http: HttpClient,
    endpoint: LlmEndpoint,
    model: String,
}

impl HttpChatModel {
    pub fn new(cfg: &Config, endpoint: LlmEndpoint) -> Result<Self> {
        let http = HttpClient::new(
            Service::Generation,
            cfg.request_timeout,
            cfg.connect_timeout,
            bearer_headers(endpoint.api_key.as_deref())?,
        )?;
        Ok(Self {
            http,
            endpoint,
            model: cfg.chat_model.clone(),
        })
    }

    fn chat_openai(&self, messages: &[Message], temperature: f32) -> Result<Option<String>> {
        let url = format!("{}/chat/completions", self.endpoint.base_url);
        let req = OpenAiChatRequest {
            model: &self.model,
            messages,
            temperature,
        };
        let res = self.http.post_json::<OpenAiChatResponse, _>(&url, &req)?;
        Ok(res
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content))
    }

    fn chat_ollama(&self, messages: &[Message], temperature: f32) -> Result<Option<String>> {
        let url = format!("{}/api/chat", self.endpoint.base_url);
        let req = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: OllamaOptions { temperature },
        };
        let res = self.http.post_json::<OllamaChatResponse, _>(&url, &req)?;
        Ok(res.message.and_then(|m| m.content))
    }
}

impl ChatModel for HttpChatModel {
    fn chat(&self, messages: &[Message], temperature: f32) -> Result<String> {
        let content = match self.endpoint.provider {
            Provider::OpenAi => self.chat_openai(messages, temperature)?,
            Provider::Ollama => self.chat_ollama(messages, temperature)?,
        };
        content
            .filter(|c| !c.trim().is_empty())
            .ok_or(RagError::EmptyResponse {
                service: Service::Generation,
            })
    }
}

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: ChatMessage,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct CountingModel {
        calls: AtomicUsize,
    }

    impl ChatModel for CountingModel {
        fn chat(&self, messages: &[Message], _temperature: f32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{} message(s)", messages.len()))
        }
    }

    fn chat_model(provider: &str, url: &str) -> HttpChatModel {
        let vars: HashMap<&str, String> = HashMap::from([
            ("LLM_PROVIDER", provider.to_string()),
            ("OPENAI_API_KEY", "sk-test".to_string()),
            ("OPENAI_BASE_URL", url.to_string()),
            ("OLLAMA_URL", url.to_string()),
        ]);
        let cfg = Config::from_vars(|k| vars.get(k).cloned());
        let endpoint = cfg.llm_endpoint().unwrap();
        HttpChatModel::new(&cfg, endpoint).unwrap()
    }

    fn documents() -> Vec<RetrievedDocument> {
        vec![RetrievedDocument {
            text: "COMPSCI 557: Database Systems Relational model.".into(),
            title: "COMPSCI 557: Database Systems".into(),
            url: "https://example.edu/cs557".into(),
        }]
    }

    #[test]
    fn empty_context_refuses_without_calling_the_model() {
        let model = CountingModel {
            calls: AtomicUsize::new(0),
        };
        let answer = generate_answer(&model, "underwater basket weaving?", &[], 0.2).unwrap();
        assert_eq!(answer, REFUSAL);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn context_is_sent_to_the_model() {
        let model = CountingModel {
            calls: AtomicUsize::new(0),
        };
        let answer = generate_answer(&model, "databases?", &documents(), 0.2).unwrap();
        assert_eq!(answer, "1 message(s)");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn openai_request_carries_temperature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"model": "gpt-3.5-turbo", "temperature": 0.5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "COMPSCI 557 covers SQL."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let answer = tokio::task::spawn_blocking(move || {
            generate_answer(&chat_model("openai", &uri), "databases?", &documents(), 0.5)
        })
        .await
        .unwrap()
        .expect("answer");
        assert_eq!(answer, "COMPSCI 557 covers SQL.");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ollama_chat_is_not_streamed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "Grounded."}
            })))
            .mount(&server)
            .await;

        let uri = server.uri();
        let answer = tokio::task::spawn_blocking(move || {
            chat_model("ollama", &uri).chat(&[Message::user("q")], 0.2)
        })
        .await
        .unwrap()
        .expect("answer");
        assert_eq!(answer, "Grounded.");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blank_completion_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let uri = server.uri();
        let err = tokio::task::spawn_blocking(move || {
            chat_model("openai", &uri).chat(&[Message::user("q")], 0.2)
        })
        .await
        .unwrap()
        .expect_err("no choices");
        assert!(matches!(
            err,
            RagError::EmptyResponse {
                service: Service::Generation
            }
        ));
    }
}
