use std::pin::Pin;

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::core::ClientError;
use crate::eventsource::{Frame, FrameKind, EVENT_DELIMITER};

pub type EventStream =
    Pin<Box<dyn Stream<Item = Result<StreamEvent, ClientError>> + Send + 'static>>;

/// A classified event emitted by the ingestor, in byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental assistant content
    Content(String),
    /// Application-level error surfaced by the far end; the stream continues
    Error(String),
    /// Terminal signal; nothing follows
    Done,
}

/// Wire shape of the consumed body, fixed per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    /// Blank-line delimited SSE records, buffered across chunk boundaries
    Sse,
    /// Self-contained chunks; a leading marker token is stripped per line
    /// and the remainder emitted immediately, with no buffering delay
    Raw { marker: String },
}

/// Undecoded trailing bytes and unframed text held between chunk deliveries.
/// Owned exclusively by the ingestor; cleared on a terminal signal.
#[derive(Debug, Default)]
struct PendingBuffer {
    bytes: Vec<u8>,
    text: String,
}

impl PendingBuffer {
    /// Decodes a chunk into the text buffer. Chunks may split multi-byte
    /// sequences at arbitrary boundaries, so an incomplete trailing sequence
    /// is carried over to the next delivery. Invalid bytes fail fast.
    fn decode(&mut self, chunk: &[u8]) -> Result<(), ClientError> {
        self.bytes.extend_from_slice(chunk);
        match std::str::from_utf8(&self.bytes) {
            Ok(valid) => {
                self.text.push_str(valid);
                self.bytes.clear();
                Ok(())
            }
            Err(err) => {
                let valid_up_to = err.valid_up_to();
                if err.error_len().is_some() {
                    self.reset();
                    return Err(ClientError::Decode(format!(
                        "invalid UTF-8 sequence at byte {valid_up_to} of the buffered stream"
                    )));
                }
                self.text
                    .push_str(&String::from_utf8_lossy(&self.bytes[..valid_up_to]));
                self.bytes.drain(..valid_up_to);
                Ok(())
            }
        }
    }

    /// Pops the next complete blank-line delimited segment, if any.
    fn next_segment(&mut self) -> Option<String> {
        let end = self.text.find(EVENT_DELIMITER)?;
        let segment = self.text[..end].to_string();
        self.text.drain(..end + EVENT_DELIMITER.len());
        Some(segment)
    }

    /// Takes whatever text remains, leaving the buffer empty.
    fn take_tail(&mut self) -> Option<String> {
        if self.text.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.text))
        }
    }

    /// Closes the buffer at end-of-stream, handing back any unframed text.
    /// A leftover undecoded byte tail means the stream was truncated
    /// mid-character, which fails like any other decode error.
    fn finish(&mut self) -> Result<Option<String>, ClientError> {
        if !self.bytes.is_empty() {
            let len = self.bytes.len();
            self.reset();
            return Err(ClientError::Decode(format!(
                "stream ended mid-character with {len} undecoded bytes"
            )));
        }
        Ok(self.take_tail())
    }

    fn reset(&mut self) {
        self.bytes.clear();
        self.text.clear();
    }
}

/// Maps a complete frame to the event the caller sees, or to nothing.
///
/// A `done` kind or a bare `done` payload wins over everything else; an
/// `error` frame is surfaced but does not terminate the stream; frames with
/// an unrecognized kind or an empty data-only payload are dropped.
fn classify(frame: Frame) -> Option<StreamEvent> {
    if frame.kind == Some(FrameKind::Done) || frame.data == "done" {
        return Some(StreamEvent::Done);
    }
    match frame.kind {
        Some(FrameKind::Message) | None if !frame.data.is_empty() => {
            Some(StreamEvent::Content(frame.data))
        }
        Some(FrameKind::Error) => Some(StreamEvent::Error(frame.data)),
        _ => None,
    }
}

/// Strips the marker token from each line of an unframed chunk and
/// concatenates what remains. Only the single space separating the marker
/// from its value is consumed; further leading spaces are part of the
/// fragment.
fn extract_raw(text: &str, marker: &str) -> String {
    let mut payload = String::new();
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(marker) {
            payload.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    payload
}

/// Demultiplexes one HTTP response body into classified events.
///
/// One ingestor consumes exactly one chunk source to completion or
/// cancellation and is then spent; it keeps no state across requests.
/// Suspension happens only at the chunk read, where the cancellation token
/// is also observed.
pub struct StreamIngestor {
    framing: Framing,
    cancel: CancellationToken,
}

impl StreamIngestor {
    pub const fn new(framing: Framing, cancel: CancellationToken) -> Self {
        Self { framing, cancel }
    }

    /// Consumes the chunk source and yields events strictly in the order
    /// their bytes arrived.
    ///
    /// The stream is finite: it ends on a terminal `done` signal (remaining
    /// bytes are discarded), on end-of-stream (the trailing partial segment
    /// is flushed best-effort), or on cancellation (the buffer is discarded
    /// and nothing further is emitted).
    pub fn ingest<S, B>(self, chunks: S) -> EventStream
    where
        S: Stream<Item = Result<B, ClientError>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
    {
        let Self { framing, cancel } = self;
        Box::pin(try_stream! {
            futures::pin_mut!(chunks);
            let mut buffer = PendingBuffer::default();
            let mut terminated = false;
            let mut cancelled = false;

            'read: loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        debug!("[Ingest] cancelled, discarding buffered state");
                        cancelled = true;
                        break 'read;
                    }
                    next = chunks.next() => next,
                };
                let Some(chunk) = next else { break 'read };
                let chunk = chunk?;
                buffer.decode(chunk.as_ref())?;

                match &framing {
                    Framing::Sse => {
                        while let Some(segment) = buffer.next_segment() {
                            let Ok(frame) = Frame::parse(&segment) else {
                                continue;
                            };
                            if let Some(event) = classify(frame) {
                                let done = matches!(event, StreamEvent::Done);
                                yield event;
                                if done {
                                    debug!("[Ingest] terminal signal received");
                                    terminated = true;
                                    break 'read;
                                }
                            }
                        }
                    }
                    Framing::Raw { marker } => {
                        let Some(text) = buffer.take_tail() else {
                            continue;
                        };
                        let payload = extract_raw(&text, marker);
                        if let Some(event) = classify(Frame::data_only(payload)) {
                            let done = matches!(event, StreamEvent::Done);
                            yield event;
                            if done {
                                debug!("[Ingest] terminal signal received");
                                terminated = true;
                                break 'read;
                            }
                        }
                    }
                }
            }

            if cancelled || terminated {
                buffer.reset();
            } else if let Some(tail) = buffer.finish()? {
                // End-of-stream: the trailing partial segment counts as complete.
                if let Ok(frame) = Frame::parse(&tail) {
                    if let Some(event) = classify(frame) {
                        yield event;
                    }
                }
            }
        })
    }
}
