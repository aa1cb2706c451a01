use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;

use crate::error::{RagError, Result, Service};

/// Blocking JSON client bound to one external service. Every request carries the
/// configured timeout, and every failure is reported against `service`.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    service: Service,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(
        service: Service,
        timeout: Duration,
        connect_timeout: Duration,
        headers: HeaderMap,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .default_headers(headers)
            .user_agent(concat!("pantherbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RagError::Transport {
                service,
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            service,
            timeout,
        })
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.send(self.client.get(url), url)
    }

    pub fn post_json<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T> {
        let req = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        self.send(req, url)
    }

    pub fn put_json<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T> {
        let req = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        self.send(req, url)
    }

    fn send<T: DeserializeOwned>(&self, req: RequestBuilder, url: &str) -> Result<T> {
        let resp = req.send().map_err(|e| self.transport_error(&e))?;
        let status = resp.status();
        let text = resp.text().map_err(|e| self.transport_error(&e))?;
        if !status.is_success() {
            tracing::error!(service = %self.service, %url, %status, "request failed: {text}");
            return Err(RagError::Status {
                service: self.service,
                status: status.as_u16(),
                body: text,
            });
        }
        from_str::<T>(&text).map_err(|e| RagError::Decode {
            service: self.service,
            message: format!("{e} | {text}"),
        })
    }

    fn transport_error(&self, err: &reqwest::Error) -> RagError {
        if err.is_timeout() {
            RagError::Timeout {
                service: self.service,
                secs: self.timeout.as_secs(),
            }
        } else {
            RagError::Transport {
                service: self.service,
                message: err.to_string(),
            }
        }
    }
}

pub fn bearer_headers(api_key: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(key) = api_key {
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {key}"))?);
    }
    Ok(headers)
}

pub fn api_key_headers(api_key: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(key) = api_key {
        headers.insert(HeaderName::from_static("api-key"), header_value(key)?);
    }
    Ok(headers)
}

fn header_value(raw: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw)
        .map_err(|_| RagError::Config("credential contains characters not allowed in a header".to_string()))
}
