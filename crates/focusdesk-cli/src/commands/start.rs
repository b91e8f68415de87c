use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::backend;
use crate::terminal::TerminalNotifier;
use focusdesk_core::timer::validate_duration;
use focusdesk_core::{Config, Event, FocusTimer, TaskId};

#[derive(Args)]
pub struct StartArgs {
    /// Session length in minutes (1-180); defaults to timer.default_duration
    #[arg(long, short)]
    minutes: Option<u32>,
    /// Task worked on during the session (repeatable)
    #[arg(long = "task")]
    tasks: Vec<String>,
    /// Session notes
    #[arg(long)]
    notes: Option<String>,
    /// Keep writes in memory and print them instead of storing
    #[arg(long)]
    dry_run: bool,
}

/// Stdin commands accepted while a session runs.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Pause,
    Resume,
    Stop,
    Notes(String),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (head, rest) = line
        .split_once(char::is_whitespace)
        .map(|(h, r)| (h, r.trim()))
        .unwrap_or((line, ""));
    match head {
        "p" | "pause" => Some(Command::Pause),
        "r" | "resume" => Some(Command::Resume),
        "s" | "stop" => Some(Command::Stop),
        "n" | "notes" => Some(Command::Notes(rest.to_string())),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

pub fn run(args: StartArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(minutes) = args.minutes {
        validate_duration(minutes)?;
    }
    let config = Config::load()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_session(args, config))
}

async fn run_session(args: StartArgs, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = backend::open(&config, args.dry_run)?;
    let notifier = Arc::new(TerminalNotifier::new(
        config.notifications.bell,
        config.notifications.title_status,
    ));
    let timer = FocusTimer::builder(backend.store, Arc::new(backend.identity))
        .notifier(notifier)
        .preferences(backend.preferences)
        .duration_min(config.timer.default_duration)
        .tick_period(Duration::from_millis(config.timer.tick_ms))
        .build()?;

    timer.set_current_tasks(args.tasks.into_iter().map(TaskId::from));
    if let Some(notes) = args.notes {
        timer.set_notes(notes);
    }

    let mut events = timer.subscribe();
    timer.start(args.minutes);
    eprintln!("commands: p pause, r resume, s stop, n <text> notes, q quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut interrupted = false;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(Event::TimerTicked { .. }) => {}
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    if matches!(event, Event::TimerCompleted { .. } | Event::TimerReset { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => debug!("event stream lagged by {n}"),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => match parse_command(&line) {
                    Some(Command::Pause) => {
                        if !timer.pause() {
                            eprintln!("not running");
                        }
                    }
                    Some(Command::Resume) => {
                        if !timer.resume() {
                            eprintln!("not paused");
                        }
                    }
                    Some(Command::Stop) | Some(Command::Quit) => timer.reset(),
                    Some(Command::Notes(notes)) => timer.set_notes(notes),
                    None if line.trim().is_empty() => {
                        println!("{}", serde_json::to_string(&timer.snapshot())?);
                    }
                    None => eprintln!("unknown command: {}", line.trim()),
                },
                None => stdin_open = false,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                timer.reset();
            }
        }
    }

    timer.flush().await;

    if let Some(memory) = backend.dry_run {
        for call in memory.calls() {
            eprintln!("dry-run: {call:?}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_commands() {
        assert_eq!(parse_command("p"), Some(Command::Pause));
        assert_eq!(parse_command(" resume "), Some(Command::Resume));
        assert_eq!(parse_command("s"), Some(Command::Stop));
        assert_eq!(parse_command("q"), Some(Command::Quit));
    }

    #[test]
    fn notes_keep_the_rest_of_the_line() {
        assert_eq!(
            parse_command("n  chapter 3 proofs"),
            Some(Command::Notes("chapter 3 proofs".into()))
        );
        assert_eq!(parse_command("n"), Some(Command::Notes(String::new())));
    }

    #[test]
    fn unknown_input_is_rejected() {
        assert_eq!(parse_command("jump"), None);
        assert_eq!(parse_command(""), None);
    }
}
