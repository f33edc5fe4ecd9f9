pub mod chat;
pub mod session;
pub mod survey;

pub use chat::{ChatBackend, ChatClient};
pub use session::{ChatSession, Outcome, FALLBACK_MESSAGE};
pub use survey::{AnswerValue, Question, QuestionKind, SurveyClient, SurveyStep};
