//! Transport to the remote text-processing service.

mod http;

pub use http::{ApiClient, ApiClientBuilder, API_KEY_HEADER, DEFAULT_TIMEOUT};

use crate::types::ProcessRequest;
use crate::Result;
use async_trait::async_trait;

/// Anything that can turn a [`ProcessRequest`] into a response payload.
///
/// [`ApiClient`] is the production implementation; the relay only depends on
/// this trait so it can be driven without a network.
#[async_trait]
pub trait ProcessApi: Send + Sync {
    async fn process(&self, request: &ProcessRequest) -> Result<serde_json::Value>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
