use std::fmt::{self, Display, Formatter};

use thiserror::Error;

pub const EVENT_DELIMITER: &str = "\n\n";
const FIELD_SEPARATOR: char = ':';

/// Possible errors that can occur while parsing SSE records
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid record: record contains no data")]
    NoData,
}

/// Event type carried by a record's `event:` line.
///
/// Only `message`, `done` and `error` are meaningful to this client;
/// anything else parses to `Other` and is dropped during classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Message,
    Done,
    Error,
    Other,
}

impl FrameKind {
    fn parse(value: &str) -> Self {
        match value {
            "message" => Self::Message,
            "done" => Self::Done,
            "error" => Self::Error,
            _ => Self::Other,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Done => "done",
            Self::Error => "error",
            Self::Other => "other",
        }
    }
}

/// One fully-buffered logical record extracted from the byte stream.
///
/// A record carries:
/// - An optional event kind (absent for data-only records)
/// - The joined payload of its `data:` lines (required)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Kind set by an `event:` line, if any
    pub kind: Option<FrameKind>,
    /// The record payload, `data:` lines joined with line breaks
    pub data: String,
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Frame {{ kind: {:?}, data: {} }}", self.kind, self.data)
    }
}

impl Frame {
    /// Creates a data-only frame, the backward-compatible record shape.
    pub const fn data_only(data: String) -> Self {
        Self { kind: None, data }
    }

    /// Parses one blank-line delimited record.
    ///
    /// Lines of the form `event:<type>` set the frame kind, `data:<text>`
    /// lines are collected (trimmed) and joined with line breaks. Lines
    /// matching neither field are ignored. A record without data lines is
    /// not a frame.
    pub fn parse(input: &str) -> Result<Self, FrameError> {
        let mut kind = None;
        let mut data_lines = Vec::new();

        for line in input.lines() {
            if line.is_empty() {
                continue;
            }

            if let Some((field, value)) = line.split_once(FIELD_SEPARATOR) {
                let value = value.trim();
                match field {
                    "event" => kind = Some(FrameKind::parse(value)),
                    "data" => data_lines.push(value),
                    _ => {} // Ignore unknown fields as per SSE spec
                }
            }
        }

        if data_lines.is_empty() {
            return Err(FrameError::NoData);
        }

        Ok(Self {
            kind,
            data: data_lines.join("\n"),
        })
    }

    /// Encodes the frame back into its wire representation, including the
    /// terminating blank line.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if let Some(kind) = self.kind {
            out.push_str("event: ");
            out.push_str(kind.as_str());
            out.push('\n');
        }
        for line in self.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_parse_empty() {
        assert_eq!(Frame::parse(""), Err(FrameError::NoData));
    }

    #[test]
    fn test_frame_parse_no_data() {
        assert_eq!(Frame::parse("event: message\n"), Err(FrameError::NoData));
    }

    #[test]
    fn test_frame_parse_data_only() {
        let frame = Frame::parse("data: hello").unwrap();
        assert_eq!(frame.data, "hello");
        assert!(frame.kind.is_none());
    }

    #[test]
    fn test_frame_parse_kind_and_multiline_data() {
        let frame = Frame::parse("event: message\ndata: line1\ndata: line2\n").unwrap();
        assert_eq!(frame.kind, Some(FrameKind::Message));
        assert_eq!(frame.data, "line1\nline2");
    }

    #[test]
    fn test_frame_parse_unknown_kind() {
        let frame = Frame::parse("event: ping\ndata: x").unwrap();
        assert_eq!(frame.kind, Some(FrameKind::Other));
    }

    #[test]
    fn test_frame_parse_ignores_unrelated_lines() {
        let frame = Frame::parse("id: 42\nretry: 5000\ndata: payload").unwrap();
        assert_eq!(frame.kind, None);
        assert_eq!(frame.data, "payload");
    }

    #[test]
    fn test_frame_parse_trims_data_values() {
        let frame = Frame::parse("data:  spaced  ").unwrap();
        assert_eq!(frame.data, "spaced");
    }

    #[test]
    fn test_frame_encode_round_trips() {
        let frame = Frame {
            kind: Some(FrameKind::Error),
            data: "first\nsecond".to_string(),
        };
        let wire = frame.encode();
        assert_eq!(wire, "event: error\ndata: first\ndata: second\n\n");

        let record = wire.trim_end_matches(EVENT_DELIMITER);
        assert_eq!(Frame::parse(record).unwrap(), frame);
    }
}
