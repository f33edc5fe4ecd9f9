use std::io::Write;

use futures::StreamExt;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::client::chat::ChatBackend;
use crate::core::transcript::{Role, Transcript, TranscriptCache};
use crate::core::ClientError;
use crate::ingest::StreamEvent;

/// Shown in place of the assistant reply when a send fails.
pub const FALLBACK_MESSAGE: &str = "Sorry, there was an error.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The reply stream ran to its end or terminal signal
    Completed,
    /// The caller cancelled mid-stream; not an error
    Cancelled,
}

/// Owns the transcript for one conversation and folds ingestor events into
/// it. Enforces at most one active stream: issuing a new send cancels the
/// previous in-flight one.
pub struct ChatSession {
    backend: Box<dyn ChatBackend>,
    transcript: Transcript,
    cache: Option<TranscriptCache>,
    active: Option<CancellationToken>,
}

impl ChatSession {
    /// Creates a session, restoring the cached transcript if a cache is
    /// provided.
    pub fn new(
        backend: Box<dyn ChatBackend>,
        cache: Option<TranscriptCache>,
    ) -> Result<Self, ClientError> {
        let transcript = match &cache {
            Some(cache) => Transcript::from_entries(cache.load()?),
            None => Transcript::new(),
        };
        Ok(Self {
            backend,
            transcript,
            cache,
            active: None,
        })
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Sends a message with a fresh cancellation token.
    pub async fn send<W: Write + Send>(
        &mut self,
        message: &str,
        writer: &mut W,
    ) -> Result<Outcome, ClientError> {
        self.send_with(CancellationToken::new(), message, writer)
            .await
    }

    /// Sends a message, streaming the reply into the transcript and writing
    /// content to `writer` as it arrives. The caller keeps the token and may
    /// cancel it at any point; cancellation ends the send without error.
    pub async fn send_with<W: Write + Send>(
        &mut self,
        cancel: CancellationToken,
        message: &str,
        writer: &mut W,
    ) -> Result<Outcome, ClientError> {
        if let Some(previous) = self.active.replace(cancel.clone()) {
            debug!("[Session] cancelling previous in-flight stream");
            previous.cancel();
        }

        self.transcript.push(Role::User, message);
        self.transcript.push(Role::Assistant, "");

        let result = self.drive(&cancel, message, writer).await;
        self.active = None;

        match result {
            Ok(()) => {
                self.persist();
                if cancel.is_cancelled() {
                    Ok(Outcome::Cancelled)
                } else {
                    Ok(Outcome::Completed)
                }
            }
            Err(err) => {
                self.transcript.replace_last(FALLBACK_MESSAGE);
                self.persist();
                Err(err)
            }
        }
    }

    async fn drive<W: Write + Send>(
        &mut self,
        cancel: &CancellationToken,
        message: &str,
        writer: &mut W,
    ) -> Result<(), ClientError> {
        let mut events = self.backend.stream_reply(message, cancel.clone()).await?;
        // Incremental content extends the open reply entry; an error event
        // closes it, so later content starts a fresh one.
        let mut reply_open = true;

        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Content(text) => {
                    if !reply_open {
                        self.transcript.push(Role::Assistant, "");
                        reply_open = true;
                    }
                    self.transcript.extend_last(&text);
                    write!(writer, "{text}")?;
                    writer.flush()?;
                }
                StreamEvent::Error(message) => {
                    warn!("[Session] application error from stream: {message}");
                    write!(writer, "\n[error: {message}]\n")?;
                    writer.flush()?;
                    self.transcript.push(Role::Assistant, message);
                    reply_open = false;
                }
                StreamEvent::Done => {
                    debug!("[Session] terminal signal");
                    break;
                }
            }
        }

        Ok(())
    }

    fn persist(&self) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.save(&self.transcript) {
                warn!("[Session] failed to persist transcript: {err}");
            }
        }
    }
}
