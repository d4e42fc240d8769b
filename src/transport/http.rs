use super::{ProcessApi, TransportError};
use crate::types::ProcessRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Generous default so cold-starting backends have time to answer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// HTTP client for the remote `/process` endpoint.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// POST the request and return the response body untouched.
    pub async fn call(&self, request: &ProcessRequest) -> Result<Value> {
        let url = self.url("/process");
        let mut req = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }

        tracing::debug!(
            url = %url,
            mode = %request.mode(),
            text_len = request.text().len(),
            "posting process request"
        );
        let response = req.send().await.map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(_) => status.canonical_reason().unwrap_or_default().to_string(),
            };
            tracing::warn!(status = status.as_u16(), "process request rejected");
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<Value>().await.map_err(|e| self.map_error(e))
    }

    /// GET `<endpoint>/health`.
    pub async fn health(&self) -> Result<Value> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        response.json::<Value>().await.map_err(|e| self.map_error(e))
    }

    fn map_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                after: self.timeout,
            }
        } else {
            Error::Transport(TransportError::Http(e))
        }
    }
}

#[async_trait]
impl ProcessApi for ApiClient {
    async fn process(&self, request: &ProcessRequest) -> Result<Value> {
        self.call(request).await
    }
}

pub struct ApiClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Duration,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::configuration("API base URL must be specified"))?;
        url::Url::parse(&base_url)
            .map_err(|e| Error::configuration(format!("invalid API base URL '{}': {}", base_url, e)))?;
        if self.api_key.is_none() {
            tracing::warn!("no API key configured; requests will be sent unauthenticated");
        }
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;
        Ok(ApiClient {
            client,
            base_url,
            api_key: self.api_key,
            timeout: self.timeout,
        })
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
