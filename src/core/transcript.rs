use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::storage::KeyValueStore;
use crate::core::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

/// Ordered list of exchanged messages. Owned by the caller driving the
/// ingestor; the ingestor itself never touches it.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn from_entries(entries: Vec<TranscriptEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            role,
            content: content.into(),
        });
    }

    /// Appends text to the content of the last entry. Used for incremental
    /// token delivery; a no-op on an empty transcript.
    pub fn extend_last(&mut self, text: &str) {
        if let Some(last) = self.entries.last_mut() {
            last.content.push_str(text);
        }
    }

    /// Replaces the content of the last entry, keeping its role.
    pub fn replace_last(&mut self, content: impl Into<String>) {
        if let Some(last) = self.entries.last_mut() {
            last.content = content.into();
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Persists the transcript as a JSON list of `{role, content}` records
/// through an injected key-value store, under a fixed key.
pub struct TranscriptCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl TranscriptCache {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Loads the cached transcript; a missing key yields an empty list.
    pub fn load(&self) -> Result<Vec<TranscriptEntry>, ClientError> {
        match self.store.get(&self.key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| ClientError::Storage(format!("Corrupt transcript cache: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    pub fn save(&self, transcript: &Transcript) -> Result<(), ClientError> {
        let raw = serde_json::to_string(transcript.entries())?;
        self.store.set(&self.key, &raw)
    }
}
