use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use reqwest::{header::HeaderValue, Client};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::core::{ClientError, Config};
use crate::ingest::{EventStream, StreamIngestor};

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Seam between the session and the transport, so sessions can be driven by
/// a scripted backend in tests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Issues one chat request and returns the classified event stream for
    /// its reply. Fails before any event is produced if the transport does.
    async fn stream_reply(
        &self,
        message: &str,
        cancel: CancellationToken,
    ) -> Result<EventStream, ClientError>;
}

/// HTTP client for the streaming chat endpoint.
pub struct ChatClient {
    client: Client,
    config: Config,
}

impl ChatClient {
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn stream_reply(
        &self,
        message: &str,
        cancel: CancellationToken,
    ) -> Result<EventStream, ClientError> {
        let url = self.config.chat_url();
        debug!("[Chat] POST {url}");

        let response = self
            .client
            .post(url)
            .header("accept", HeaderValue::from_static("text/event-stream"))
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(ClientError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Transport(format!(
                "chat request failed with status {status}: {error_text}"
            )));
        }

        let chunks = response.bytes_stream().map(|chunk| chunk.map_err(ClientError::from));
        let ingestor = StreamIngestor::new(self.config.framing(), cancel);
        Ok(ingestor.ingest(chunks))
    }
}
