use clap::{Parser, Subcommand};

use crate::core::FramingMode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Override the stream framing mode (sse or raw)
    #[arg(short, long, value_enum)]
    pub framing: Option<FramingMode>,

    /// Cancel the in-flight request after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Disable the local transcript cache
    #[arg(long)]
    pub no_cache: bool,

    /// Enable debug output
    #[arg(short, long, default_value = "false")]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a chat message and stream the assistant's reply
    Chat {
        /// The message to send
        message: Vec<String>,
    },
    /// Answer a survey instance question by question
    Survey {
        /// Survey instance id to start
        instance_id: String,
    },
}
