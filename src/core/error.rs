#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network-related errors without an HTTP status (connection refused, body read failure)
    #[error("Network error: {0}")]
    Network(reqwest::Error),
    /// Non-success HTTP status, reported before any chunk is read
    #[error("Transport failure: {0}")]
    Transport(String),
    /// Malformed byte sequence while decoding a streamed chunk
    #[error("Decode failure: {0}")]
    Decode(String),
    /// Malformed or unexpected payloads from the survey endpoints
    #[error("API error: {0}")]
    Api(String),
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
    /// Transcript cache / key-value store error
    #[error("Storage error: {0}")]
    Storage(String),
    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        // Errors carrying an HTTP status happened after the server answered;
        // everything else never made it past the transport.
        if let Some(status) = err.status() {
            Self::Transport(format!("request failed with status {status}: {err}"))
        } else {
            Self::Network(err)
        }
    }
}
