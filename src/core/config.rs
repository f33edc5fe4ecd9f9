use crate::core::ClientError;
use crate::ingest::Framing;
use clap::ValueEnum;
use serde::Deserialize;
use std::fs;
use std::path::Path;

include!(concat!(env!("OUT_DIR"), "/config_embedded.rs"));

const DEFAULT_RAW_MARKER: &str = "data:";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub chat_path: String,
    pub survey_path: String,
    pub framing: FramingMode,
    pub raw_marker: Option<String>,
    pub cache_key: String,
    pub deadline_secs: Option<u64>,
}

/// Wire shape of the chat endpoint's streamed body.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FramingMode {
    /// Blank-line delimited SSE records
    #[value(name = "sse")]
    Sse,
    /// Unframed text chunks with a per-line marker prefix
    #[value(name = "raw")]
    Raw,
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("Invalid default config")
    }
}

impl Config {
    pub fn load() -> Result<Self, ClientError> {
        let config_path = Path::new("config.toml");
        if config_path.exists() {
            Self::load_from(config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ClientError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&contents)
            .map_err(|e| ClientError::Config(format!("Failed to parse config file: {e}")))
    }

    pub fn update_framing(&mut self, mode: FramingMode) {
        self.framing = mode;
    }

    /// Framing policy handed to the ingestor for each chat request.
    pub fn framing(&self) -> Framing {
        match self.framing {
            FramingMode::Sse => Framing::Sse,
            FramingMode::Raw => Framing::Raw {
                marker: self
                    .raw_marker
                    .clone()
                    .unwrap_or_else(|| DEFAULT_RAW_MARKER.to_string()),
            },
        }
    }

    pub fn chat_url(&self) -> String {
        format!("{base}{path}", base = self.api_base_url, path = self.chat_path)
    }

    pub fn survey_start_url(&self, instance_id: &str) -> String {
        format!(
            "{base}{path}/instance/{instance_id}/start",
            base = self.api_base_url,
            path = self.survey_path
        )
    }

    pub fn survey_answer_url(&self, response_id: &str) -> String {
        format!(
            "{base}{path}/responses/{response_id}/answer",
            base = self.api_base_url,
            path = self.survey_path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_parses() {
        let config = Config::default();
        assert_eq!(config.framing, FramingMode::Sse);
        assert_eq!(config.cache_key, "chat-messages");
        assert!(config.chat_url().ends_with("/api/v1/chat/"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
api_base_url = "https://example.org"
chat_path = "/chat"
survey_path = "/survey"
framing = "raw"
raw_marker = "tok:"
cache_key = "messages"
deadline_secs = 30
"#
        )
        .expect("write config");

        let config = Config::load_from(file.path()).expect("config should parse");
        assert_eq!(config.api_base_url, "https://example.org");
        assert_eq!(config.framing, FramingMode::Raw);
        assert_eq!(config.deadline_secs, Some(30));
        assert!(matches!(config.framing(), Framing::Raw { marker } if marker == "tok:"));
    }

    #[test]
    fn test_survey_urls() {
        let config = Config::default();
        assert_eq!(
            config.survey_start_url("abc"),
            "http://localhost:8000/api/v1/survey-flow/instance/abc/start"
        );
        assert_eq!(
            config.survey_answer_url("r-1"),
            "http://localhost:8000/api/v1/survey-flow/responses/r-1/answer"
        );
    }
}
