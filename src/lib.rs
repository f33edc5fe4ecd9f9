pub mod cli;
pub mod client;
pub mod core;
pub mod eventsource;
pub mod ingest;

pub use client::{ChatClient, ChatSession, SurveyClient};
pub use core::Config;
pub use ingest::{Framing, StreamEvent, StreamIngestor};
