use std::fmt;

use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::{ClientError, Config};

/// One survey question, passed through from the backend. The payload is
/// opaque to this client: choices and bounds are rendered, never validated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    MultipleChoice,
    Checkbox,
    Rating,
    /// Unknown question types fall back to free-text input
    #[serde(other)]
    Unknown,
}

/// Closed set of answer shapes, one per supported question kind. Serializes
/// to the bare JSON value the backend expects inside `{"value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Choice(String),
    Selection(Vec<String>),
    Rating(i64),
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) | Self::Choice(text) => write!(f, "{text}"),
            Self::Selection(items) => write!(f, "{}", items.join(", ")),
            Self::Rating(rating) => write!(f, "{rating}"),
        }
    }
}

#[derive(Serialize)]
struct AnswerWrapper<'a> {
    value: &'a AnswerValue,
}

#[derive(Serialize)]
struct AnswerBody<'a> {
    question_id: &'a str,
    answer: Option<AnswerWrapper<'a>>,
    skipped: bool,
}

/// Response of both the start and answer endpoints. `response_id` only
/// appears on start; `question` is absent once the survey is done.
#[derive(Debug, Deserialize)]
pub struct SurveyStep {
    #[serde(default)]
    pub question: Option<Question>,
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub done: bool,
}

/// Request/response client for the survey flow endpoints. No streaming:
/// these are plain JSON calls.
pub struct SurveyClient {
    client: Client,
    config: Config,
}

impl SurveyClient {
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Starts a survey run, returning the response id and first question.
    pub async fn start(&self, instance_id: &str) -> Result<SurveyStep, ClientError> {
        let url = self.config.survey_start_url(instance_id);
        debug!("[Survey] POST {url}");

        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .send()
            .await
            .map_err(ClientError::from)?;

        Self::parse_step(response).await
    }

    /// Submits one answer (or a skip) and returns the next step.
    pub async fn answer(
        &self,
        response_id: &str,
        question_id: &str,
        answer: Option<&AnswerValue>,
        skipped: bool,
    ) -> Result<SurveyStep, ClientError> {
        let url = self.config.survey_answer_url(response_id);
        debug!("[Survey] POST {url} skipped: {skipped}");

        let body = AnswerBody {
            question_id,
            answer: answer.map(|value| AnswerWrapper { value }),
            skipped,
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(ClientError::from)?;

        Self::parse_step(response).await
    }

    async fn parse_step(response: reqwest::Response) -> Result<SurveyStep, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Transport(format!(
                "survey request failed with status {status}: {error_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Api(format!("Failed to parse survey response: {e}")))
    }
}
