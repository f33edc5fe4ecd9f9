use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::core::ClientError;

pub type Subscriber = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Key-scoped string storage injected into the session layer. Replaces the
/// implicit window-scoped cache of the browser client with an explicit
/// dependency that can be swapped out in tests.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    /// Registers a callback invoked with `(key, value)` after every
    /// successful `set`.
    fn subscribe(&self, subscriber: Subscriber);
}

/// In-memory store, used by tests and by sessions that opt out of caching.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&self, key: &str, value: &str) {
        let subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
        for subscriber in subscribers.iter() {
            subscriber(key, value);
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let values = self
            .values
            .lock()
            .map_err(|_| ClientError::Storage("store lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        {
            let mut values = self
                .values
                .lock()
                .map_err(|_| ClientError::Storage("store lock poisoned".to_string()))?;
            values.insert(key.to_string(), value.to_string());
        }
        self.notify(key, value);
        Ok(())
    }

    fn subscribe(&self, subscriber: Subscriber) {
        self.subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .push(subscriber);
    }
}

/// File-backed store holding a single JSON object of key/value pairs, the
/// CLI counterpart of the browser's localStorage.
pub struct FileStore {
    path: PathBuf,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn read_all(&self) -> Result<HashMap<String, String>, ClientError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| ClientError::Storage(format!("Failed to read store file: {e}")))?;
        serde_json::from_str(&raw)
            .map_err(|e| ClientError::Storage(format!("Corrupt store file: {e}")))
    }

    fn write_all(&self, values: &HashMap<String, String>) -> Result<(), ClientError> {
        let raw = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, raw)
            .map_err(|e| ClientError::Storage(format!("Failed to write store file: {e}")))
    }

    fn notify(&self, key: &str, value: &str) {
        let subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
        for subscriber in subscribers.iter() {
            subscriber(key, value);
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)?;
        self.notify(key, value);
        Ok(())
    }

    fn subscribe(&self, subscriber: Subscriber) {
        self.subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .push(subscriber);
    }
}
