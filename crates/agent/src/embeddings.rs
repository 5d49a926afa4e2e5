//! Text embeddings from an OpenAI-compatible `/embeddings` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use wayfare_core::config::EmbeddingsConfig;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to build embeddings client: {0}")]
    Client(String),
    #[error("embedding request failed: {0}")]
    Transport(String),
    #[error("embedding API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("failed to parse embedding response: {0}")]
    Decode(String),
    #[error("expected {expected} embeddings, received {received}")]
    CountMismatch { expected: usize, received: usize },
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds `texts`, returning one vector per input in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

pub struct OpenAiEmbeddings {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiEmbeddings {
    pub fn new(
        api_key: SecretString,
        config: &EmbeddingsConfig,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| EmbeddingError::Client(error.to_string()))?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            event_name = "embeddings.request",
            model = %self.model,
            inputs = texts.len(),
            "requesting embeddings"
        );

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&EmbeddingRequest { model: &self.model, input: texts })
            .send()
            .await
            .map_err(|error| EmbeddingError::Transport(error.to_string()))?;

        let status = response.status();
        let body =
            response.text().await.map_err(|error| EmbeddingError::Transport(error.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(EmbeddingError::Api { status: status.as_u16(), message });
        }

        let embeddings = parse_embedding_response(&body)?;
        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                received: embeddings.len(),
            });
        }
        Ok(embeddings)
    }
}

/// Decodes a successful response body, restoring input order from each item's `index`.
fn parse_embedding_response(body: &str) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let response: EmbeddingResponse =
        serde_json::from_str(body).map_err(|error| EmbeddingError::Decode(error.to_string()))?;
    let mut data = response.data;
    data.sort_by_key(|item| item.index);
    Ok(data.into_iter().map(|item| item.embedding).collect())
}
