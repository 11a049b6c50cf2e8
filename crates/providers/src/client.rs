use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Build the reqwest client shared by the chat and embeddings providers.
pub fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build HTTP client, using default");
            Client::new()
        })
}
