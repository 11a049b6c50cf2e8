use async_trait::async_trait;
use autobrowse_core::{Error, Result};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::{BrowserConsole, ConsoleResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Serialize)]
#[serde(tag = "action")]
enum ConsoleRequest<'a> {
    #[serde(rename = "executeCode")]
    ExecuteCode { code: &'a str },
    #[serde(rename = "fetchHTML")]
    FetchHtml,
}

#[derive(Debug, Deserialize)]
pub struct ConsoleResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Persistent connection to the browser console endpoint.
///
/// The connection is established lazily on the first operation and
/// re-established if the socket was lost. A failed connect is fatal for the
/// calling operation; there is no retry loop.
pub struct ConsoleBridge {
    uri: String,
    timeout: Duration,
    stream: Option<WsStream>,
}

impl ConsoleBridge {
    pub fn new(uri: &str, timeout: Duration) -> Self {
        Self {
            uri: uri.to_string(),
            timeout,
            stream: None,
        }
    }

    async fn ensure_connected(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        url::Url::parse(&self.uri)
            .map_err(|e| Error::Connection(format!("Invalid console URI {}: {}", self.uri, e)))?;
        info!(uri = %self.uri, "Connecting to browser console");
        let (stream, _) = connect_async(self.uri.as_str()).await.map_err(|e| {
            Error::Connection(format!(
                "Failed to connect to browser console at {}: {}",
                self.uri, e
            ))
        })?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Send one request and wait for the single matching response. The
    /// round-trip is bounded by the configured timeout; an unresponsive or
    /// closed channel drops the connection and surfaces as a connection
    /// error.
    async fn roundtrip(&mut self, request: &ConsoleRequest<'_>) -> Result<ConsoleResponse> {
        self.ensure_connected().await?;

        let body = serde_json::to_string(request)?;
        debug!(body_len = body.len(), "Sending console request");

        let outcome = tokio::time::timeout(self.timeout, async {
            let stream = self.stream.as_mut().expect("connected above");
            stream
                .send(Message::Text(body))
                .await
                .map_err(|e| Error::Connection(format!("Console write failed: {}", e)))?;

            loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let response: ConsoleResponse = serde_json::from_str(&text)?;
                        return Ok(response);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(Error::Connection(
                            "Browser console closed the connection".to_string(),
                        ));
                    }
                    Some(Ok(_)) => {
                        // ping/pong/binary frames are not protocol responses
                        continue;
                    }
                    Some(Err(e)) => {
                        return Err(Error::Connection(format!("Console read failed: {}", e)));
                    }
                }
            }
        })
        .await;

        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                warn!(error = %e, "Console round-trip failed, dropping connection");
                self.stream = None;
                Err(e)
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Console round-trip timed out");
                self.stream = None;
                Err(Error::Connection(format!(
                    "Browser console did not respond within {}s",
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

#[async_trait]
impl BrowserConsole for ConsoleBridge {
    async fn execute_code(&mut self, code: &str) -> Result<ConsoleResult> {
        let response = self.roundtrip(&ConsoleRequest::ExecuteCode { code }).await?;
        let payload = serde_json::json!({
            "success": response.success,
            "result": response.result,
            "error": response.error,
        })
        .to_string();
        Ok(ConsoleResult {
            success: response.success,
            payload,
        })
    }

    async fn fetch_markup(&mut self) -> Result<String> {
        let response = self.roundtrip(&ConsoleRequest::FetchHtml).await?;
        if !response.success {
            return Err(Error::Retrieval(format!(
                "Failed to fetch HTML: {}",
                response.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        match response.result {
            Some(Value::String(markup)) => Ok(markup),
            other => Err(Error::Retrieval(format!(
                "fetchHTML returned a non-string result: {:?}",
                other
            ))),
        }
    }
}
