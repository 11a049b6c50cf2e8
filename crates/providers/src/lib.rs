pub mod client;
pub mod embeddings;
pub mod factory;
pub mod openai;

use async_trait::async_trait;
use autobrowse_core::types::{ChatMessage, LLMResponse};
use autobrowse_core::Result;
use serde_json::Value;

/// A chat-completion backend. `tools` carries OpenAI-format function schemas;
/// an empty slice means plain text completion.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], tools: &[Value]) -> Result<LLMResponse>;
}

/// A text-embedding backend used by the similarity index.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub use embeddings::OpenAIEmbedder;
pub use factory::{create_embedder, create_provider};
pub use openai::OpenAIProvider;
