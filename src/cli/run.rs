use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use log::{debug, LevelFilter};
use tokio_util::sync::CancellationToken;

use super::args::{Args, Command};
use crate::client::{
    AnswerValue, ChatClient, ChatSession, Outcome, Question, QuestionKind, SurveyClient,
};
use crate::core::storage::FileStore;
use crate::core::transcript::{Role, TranscriptCache};
use crate::core::{ClientError, Config};

const CACHE_FILE: &str = ".survey-chat-cache.json";

/// `--debug` forces debug-level logging; otherwise the environment filter
/// (RUST_LOG) decides.
pub fn log_level(debug: bool) -> Option<LevelFilter> {
    debug.then_some(LevelFilter::Debug)
}

pub async fn run(args: Args) -> Result<(), ClientError> {
    let _ = dotenv::dotenv();

    let mut config = Config::load()?;
    if let Ok(base) = dotenv::var("SURVEY_CHAT_API_BASE") {
        config.api_base_url = base;
    }
    if let Some(framing) = args.framing {
        config.update_framing(framing);
    }
    if let Some(deadline) = args.deadline_secs {
        config.deadline_secs = Some(deadline);
    }

    debug!(
        "[SETTINGS] base: {base}, framing: {framing:?}, deadline: {deadline:?}",
        base = config.api_base_url,
        framing = config.framing,
        deadline = config.deadline_secs
    );

    match args.command {
        Command::Chat { message } => {
            let message = message.join(" ");
            if message.is_empty() {
                return Err(ClientError::Config("Message must not be empty".to_string()));
            }
            run_chat(config, &message, args.no_cache).await
        }
        Command::Survey { instance_id } => run_survey(config, &instance_id).await,
    }
}

async fn run_chat(config: Config, message: &str, no_cache: bool) -> Result<(), ClientError> {
    let cache = if no_cache {
        None
    } else {
        let store = Arc::new(FileStore::new(CACHE_FILE));
        Some(TranscriptCache::new(store, config.cache_key.clone()))
    };
    let deadline = config.deadline_secs;

    let client = Box::new(ChatClient::new(config));
    let mut session = ChatSession::new(client, cache)?;

    let mut stdout = io::stdout();
    for entry in session.transcript().entries() {
        writeln!(stdout, "{}: {}", role_label(entry.role), entry.content)?;
    }

    let cancel = CancellationToken::new();
    if let Some(secs) = deadline {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            token.cancel();
        });
    }
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    writeln!(stdout, "{}: {message}", role_label(Role::User))?;
    write!(stdout, "{}: ", role_label(Role::Assistant))?;
    stdout.flush()?;

    let outcome = session.send_with(cancel, message, &mut stdout).await?;
    writeln!(stdout)?;
    if outcome == Outcome::Cancelled {
        writeln!(stdout, "{}", "[cancelled]".dimmed())?;
    }
    Ok(())
}

fn role_label(role: Role) -> colored::ColoredString {
    match role {
        Role::User => "you".blue().bold(),
        Role::Assistant => "assistant".green().bold(),
    }
}

async fn run_survey(config: Config, instance_id: &str) -> Result<(), ClientError> {
    let client = SurveyClient::new(config);
    let step = client.start(instance_id).await?;

    let response_id = step.response_id.clone().ok_or_else(|| {
        ClientError::Api("Survey start response carried no response_id".to_string())
    })?;
    let mut question = step.question;

    while let Some(current) = question.take() {
        println!("\n{}", current.text.green().bold());
        if !current.description.is_empty() {
            println!("{}", current.description.dimmed());
        }

        let answer = collect_answer(&current)?;
        let skipped = answer.is_none();
        if skipped {
            println!("{}", "(skipped)".dimmed());
        } else if let Some(value) = &answer {
            println!("{}: {value}", "you".blue().bold());
        }

        let next = client
            .answer(&response_id, &current.id, answer.as_ref(), skipped)
            .await?;
        if next.done {
            break;
        }
        question = next.question;
    }

    println!("\n{}", "Thanks! Your responses have been recorded.".bold());
    Ok(())
}

/// Prompts for one answer matching the question kind. Empty input skips.
fn collect_answer(question: &Question) -> Result<Option<AnswerValue>, ClientError> {
    match question.kind {
        QuestionKind::Text | QuestionKind::Unknown => {
            let line = prompt_line("> ")?;
            Ok((!line.is_empty()).then_some(AnswerValue::Text(line)))
        }
        QuestionKind::MultipleChoice => {
            let choices = question.choices.as_deref().unwrap_or_default();
            print_choices(choices);
            loop {
                let line = prompt_line("pick one> ")?;
                if line.is_empty() {
                    return Ok(None);
                }
                match parse_choice(&line, choices) {
                    Some(choice) => return Ok(Some(AnswerValue::Choice(choice))),
                    None => println!("{}", "Enter a number from the list.".dimmed()),
                }
            }
        }
        QuestionKind::Checkbox => {
            let choices = question.choices.as_deref().unwrap_or_default();
            print_choices(choices);
            loop {
                let line = prompt_line("pick any (comma-separated)> ")?;
                if line.is_empty() {
                    return Ok(None);
                }
                let selected: Option<Vec<String>> = line
                    .split(',')
                    .map(|part| parse_choice(part.trim(), choices))
                    .collect();
                match selected {
                    Some(items) if !items.is_empty() => {
                        return Ok(Some(AnswerValue::Selection(items)))
                    }
                    _ => println!("{}", "Enter numbers from the list.".dimmed()),
                }
            }
        }
        QuestionKind::Rating => {
            let min = question.min.unwrap_or(1);
            let max = question.max.unwrap_or(5);
            loop {
                let line = prompt_line(&format!("rate {min}-{max}> "))?;
                if line.is_empty() {
                    return Ok(None);
                }
                match line.parse::<i64>() {
                    Ok(rating) if (min..=max).contains(&rating) => {
                        return Ok(Some(AnswerValue::Rating(rating)))
                    }
                    _ => println!("{}", format!("Enter a number between {min} and {max}.").dimmed()),
                }
            }
        }
    }
}

fn print_choices(choices: &[String]) {
    for (i, choice) in choices.iter().enumerate() {
        println!("  {n}. {choice}", n = i + 1);
    }
}

fn parse_choice(input: &str, choices: &[String]) -> Option<String> {
    let index = input.parse::<usize>().ok()?.checked_sub(1)?;
    choices.get(index).cloned()
}

fn prompt_line(prompt: &str) -> Result<String, ClientError> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
