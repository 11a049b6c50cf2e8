use async_trait::async_trait;
use autobrowse_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::client::build_http_client;
use crate::Embedder;

/// OpenAI-compatible `/embeddings` client. One call embeds a whole batch of
/// chunks; the index is rebuilt from scratch, so there is no incremental path.
pub struct OpenAIEmbedder {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAIEmbedder {
    pub fn new(api_key: &str, api_base: Option<&str>, model: &str) -> Self {
        let resolved_base = api_base
            .unwrap_or("https://api.openai.com/v1")
            .trim_end_matches('/')
            .to_string();
        Self {
            client: build_http_client(Duration::from_secs(120)),
            api_key: api_key.to_string(),
            api_base: resolved_base,
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.api_base);
        info!(url = %url, model = %self.model, batch = texts.len(), "Embedding texts");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Embeddings request failed: {}", e)))?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(status = %status, body = %raw_body, "Embeddings API error");
            return Err(Error::Provider(format!("API error {}: {}", status, raw_body)));
        }

        let parsed: EmbeddingsResponse = serde_json::from_str(&raw_body)
            .map_err(|e| Error::Provider(format!("Failed to parse embeddings response: {}", e)))?;

        // The API may reorder entries; restore input order by index.
        let mut vectors = vec![Vec::new(); texts.len()];
        for entry in parsed.data {
            if entry.index >= vectors.len() {
                return Err(Error::Provider(format!(
                    "Embeddings response index {} out of range",
                    entry.index
                )));
            }
            vectors[entry.index] = entry.embedding;
        }
        if vectors.iter().any(|v| v.is_empty()) {
            return Err(Error::Provider(
                "Embeddings response missing entries".to_string(),
            ));
        }
        Ok(vectors)
    }
}
