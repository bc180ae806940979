//! Console commands: one-shot helpers and the two interactive chats.
//!
//! User-facing output goes to stdout with `println!`; diagnostics go through
//! `tracing` to stderr. Backend failures inside a loop are reported as
//! `Analysis Failed: ...` plus the remediation hint, and the loop keeps going.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::chunk::build_chunks;
use crate::config::Config;
use crate::error::ChatError;
use crate::extract::load_document;
use crate::intent::classify;
use crate::research::Answer;
use crate::session::{Assistant, Session};
use crate::timeline::visible_messages;

/// Print the intent verdict for a question.
pub fn run_screen(question: &str) {
    println!("{}", classify(question).as_str());
}

/// Print how a file would be chunked, without touching any backend.
pub fn run_chunks(config: &Config, path: &Path) -> Result<()> {
    let doc = load_document(path)?;
    let chunks = build_chunks(&doc.text, &config.chunking.splitter());

    println!("{}: {} chunks", doc.identity, chunks.len());
    for chunk in &chunks {
        println!();
        println!("--- chunk {} ({} chars) ---", chunk.index, chunk.source.chars().count());
        println!("{}", chunk.text);
    }
    Ok(())
}

/// Upload one file, ask one question, print the paced answer.
pub async fn run_ask(config: &Config, path: &Path, question: &str) -> Result<()> {
    let assistant = Assistant::from_config(config)?;
    let mut session = Session::new(config.history.policy());
    let delay = Duration::from_millis(config.display.segment_delay_ms);

    let doc = load_document(path)?;
    let outcome = assistant
        .upload(&mut session, &doc.identity, &doc.text)
        .await
        .map_err(report_and_wrap)?;
    println!("{}", outcome.message());

    let answer = assistant
        .ask(&mut session, question)
        .await
        .map_err(report_and_wrap)?;
    print_segments(&answer, delay).await;
    Ok(())
}

/// Interactive document chat.
pub async fn run_research(config: &Config, file: Option<&Path>) -> Result<()> {
    let assistant = Assistant::from_config(config)?;
    let mut session = Session::new(config.history.policy());
    let delay = Duration::from_millis(config.display.segment_delay_ms);

    println!("Research mode. Commands: /load <file>, /history, /clear, /quit");
    if let Some(path) = file {
        if let Err(e) = upload_file(&assistant, &mut session, path).await {
            report_failure(&e);
        }
    }

    let mut lines = stdin_lines();
    while let Some(line) = next_line(&mut lines, "research> ").await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Some(("/quit", _)) | Some(("/exit", _)) => break,
            Some(("/load", arg)) => {
                if arg.is_empty() {
                    println!("Usage: /load <file>");
                    continue;
                }
                if let Err(e) = upload_file(&assistant, &mut session, Path::new(arg)).await {
                    report_failure(&e);
                }
            }
            Some(("/history", _)) => {
                let history = session.research_history();
                if history.is_empty() {
                    println!("(no messages yet)");
                }
                for message in history.messages() {
                    println!("{}: {}", message.role.as_str().to_uppercase(), message.content);
                }
            }
            Some(("/clear", _)) => {
                session.clear_research();
                println!("History cleared.");
            }
            Some((other, _)) => println!("Unknown command: {}", other),
            None => match assistant.ask(&mut session, line).await {
                Ok(answer) => print_segments(&answer, delay).await,
                Err(e) => report_failure(&e),
            },
        }
    }
    Ok(())
}

/// Interactive timeline builder.
///
/// The first submission (from `--input`, `/load`, or a typed line) is
/// analyzed as raw artifacts; later lines are follow-up questions.
pub async fn run_timeline(config: &Config, input: Option<&Path>) -> Result<()> {
    let assistant = Assistant::from_config(config)?;
    let mut session = Session::new(config.history.policy());

    println!("Timeline mode. Commands: /load <file>, /history, /reset, /quit");
    if let Some(path) = input {
        let doc = load_document(path)?;
        analyze(&assistant, &mut session, &doc.text).await;
    }

    let mut lines = stdin_lines();
    while let Some(line) = next_line(&mut lines, "timeline> ").await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Some(("/quit", _)) | Some(("/exit", _)) => break,
            Some(("/load", arg)) => {
                if arg.is_empty() {
                    println!("Usage: /load <file>");
                    continue;
                }
                match load_document(Path::new(arg)) {
                    Ok(doc) => analyze(&assistant, &mut session, &doc.text).await,
                    Err(e) => println!("{}", e),
                }
            }
            Some(("/history", _)) => {
                for message in visible_messages(session.timeline_history()) {
                    println!("{}: {}", message.role.as_str().to_uppercase(), message.content);
                }
            }
            Some(("/reset", _)) => {
                session.reset_timeline();
                println!("Timeline workspace reset.");
            }
            Some((other, _)) => println!("Unknown command: {}", other),
            None if !has_analysis(&session) => analyze(&assistant, &mut session, line).await,
            None => {
                let result = assistant
                    .follow_up_timeline(&mut session, line, stream_printer())
                    .await;
                finish_stream(result);
            }
        }
    }
    Ok(())
}

async fn upload_file(
    assistant: &Assistant,
    session: &mut Session,
    path: &Path,
) -> Result<(), ChatError> {
    let doc = match load_document(path) {
        Ok(doc) => doc,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };
    let outcome = assistant.upload(session, &doc.identity, &doc.text).await?;
    println!("{}", outcome.message());
    Ok(())
}

async fn analyze(assistant: &Assistant, session: &mut Session, artifacts: &str) {
    println!("Reconstructing timeline...");
    let result = assistant
        .analyze_timeline(session, artifacts, stream_printer())
        .await;
    finish_stream(result);
}

fn has_analysis(session: &Session) -> bool {
    visible_messages(session.timeline_history()).next().is_some()
}

/// Print only the newly streamed suffix of each partial buffer.
fn stream_printer() -> impl FnMut(&str) + Send {
    let mut printed = 0;
    move |partial: &str| {
        if let Some(delta) = partial.get(printed..) {
            print!("{}", delta);
            let _ = std::io::stdout().flush();
        }
        printed = partial.len();
    }
}

fn finish_stream(result: Result<String, ChatError>) {
    match result {
        Ok(_) => println!(),
        Err(e) => {
            println!();
            report_failure(&e);
        }
    }
}

async fn print_segments(answer: &Answer, delay: Duration) {
    for segment in &answer.segments {
        println!("{}", segment);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn report_failure(err: &ChatError) {
    println!("Analysis Failed: {}", err);
    println!("{}", err.remediation());
}

fn report_and_wrap(err: ChatError) -> anyhow::Error {
    report_failure(&err);
    anyhow::Error::new(err)
}

/// Split `/cmd rest` into `("/cmd", "rest")`. Plain text is not a command.
fn parse_command(line: &str) -> Option<(&str, &str)> {
    if !line.starts_with('/') {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => Some((cmd, rest.trim())),
        None => Some((line, "")),
    }
}

fn stdin_lines() -> Lines<BufReader<Stdin>> {
    BufReader::new(tokio::io::stdin()).lines()
}

async fn next_line(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    std::io::stdout().flush().context("Failed to flush stdout")?;
    lines.next_line().await.context("Failed to read from stdin")
}
