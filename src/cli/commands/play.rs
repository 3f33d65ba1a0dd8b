//! Interactive lab session
//!
//! Implements `play`: a line-oriented terminal on stdin/stdout. Session
//! verbs such as `/answer` drive the lab; every other line, including paths
//! like `/tmp`, goes to the simulated shell.

use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::args::{ColorChoice, PlayArgs};
use crate::cli::commands::Context;
use crate::error::{CyberLabsError, Result};
use crate::observability::{EventEmitter, init_metrics};
use crate::progression::SubmitOutcome;
use crate::range::{CyberRange, LabSession};
use crate::terminal::{LineKind, TranscriptDelta};
use crate::users::User;

const SESSION_HELP: &str = "\
Session commands:
  /answer <text>  Submit an answer for the current step
  /hint           Show the hint for the current step
  /step           Show the current step again
  /replay         Start the lab over after finishing it
  /quit           Leave the lab
Anything else, including paths like /tmp, runs in the terminal (try `help`).";

/// One line of player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerInput<'a> {
    /// Shell command for the simulated terminal
    Command(&'a str),
    /// `/answer <text>`
    Answer(&'a str),
    /// `/hint`
    Hint,
    /// `/step`
    Step,
    /// `/replay`
    Replay,
    /// `/help`
    Help,
    /// `/quit` or `/exit`
    Quit,
}

impl<'a> PlayerInput<'a> {
    /// Classifies a raw input line.
    #[must_use]
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Command(line);
        };
        let (verb, arg) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(v, a)| (v, a.trim()));
        // Anything but a known verb is a path such as `/tmp` or `/bin/ls`.
        match verb {
            "answer" | "a" => Self::Answer(arg),
            "hint" => Self::Hint,
            "step" => Self::Step,
            "replay" => Self::Replay,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Command(line),
        }
    }
}

/// Run an interactive lab session until `/quit` or end of input.
///
/// # Errors
///
/// Returns a usage error when nobody is logged in, `LabNotFound` for an
/// unknown lab, or an I/O error if stdin fails.
pub async fn run(ctx: &Context, args: &PlayArgs) -> Result<()> {
    if args.metrics_port.is_some() {
        init_metrics(args.metrics_port)?;
    }
    let events = match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    };

    let range = ctx.range().await?.with_events(Arc::new(events));
    let mut user = range.require_user().await?;
    let mut session = range.open_lab(args.lab_id).await?;

    print_header(&session, &user);
    for line in session.transcript.lines() {
        println!("{}", line.content);
    }
    println!();
    print_step(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&user, &session)?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match PlayerInput::parse(&line) {
            PlayerInput::Quit => break,
            PlayerInput::Command(command) => {
                let delta = range.interpret_command(&mut session, command);
                print_delta(&delta, ctx.color);
            }
            PlayerInput::Answer("") => println!("usage: /answer <text>"),
            PlayerInput::Answer(answer) => {
                submit(&range, &mut session, &mut user, answer, args.feedback_delay).await?;
            }
            PlayerInput::Hint => print_hint(&session),
            PlayerInput::Step => print_step(&session),
            PlayerInput::Replay => match session.state.replay() {
                Ok(()) => {
                    println!("Starting over.");
                    print_step(&session);
                }
                Err(e) => println!("! {e}"),
            },
            PlayerInput::Help => println!("{SESSION_HELP}"),
        }
    }

    tracing::info!(lab_id = session.lab.id, "lab session ended");
    Ok(())
}

async fn submit(
    range: &CyberRange,
    session: &mut LabSession,
    user: &mut User,
    answer: &str,
    delay: Duration,
) -> Result<()> {
    let submission = match range.submit_step_answer(session, user, answer).await {
        Ok(submission) => submission,
        Err(CyberLabsError::Progression(e)) => {
            println!("! {e}");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    match submission.outcome {
        SubmitOutcome::Incorrect => {
            println!("✗ Incorrect. Try again.");
            tokio::time::sleep(delay).await;
            session.state.settle();
        }
        SubmitOutcome::CorrectIntermediate => {
            println!("✓ Correct!");
            tokio::time::sleep(delay).await;
            session.state.settle();
            println!();
            print_step(session);
        }
        SubmitOutcome::CorrectFinal => {
            println!("✓ Correct! Lab complete.");
            match &submission.award {
                Some(award) => println!("{}", award.message),
                None => println!("Already solved; no points awarded."),
            }
            if let Some(refreshed) = submission.user {
                println!(
                    "Score: {} pts ({})",
                    refreshed.score, refreshed.rank_title
                );
                *user = refreshed;
            }
            println!("Type /replay to play again or /quit to leave.");
        }
    }
    Ok(())
}

fn print_header(session: &LabSession, user: &User) {
    let lab = &session.lab;
    let status = if user.has_completed(lab.id) {
        " (completed)"
    } else {
        ""
    };
    println!("#{} {}{status}", lab.id, lab.title);
    println!(
        "{} | {} | {} pts | {} steps",
        lab.lab_type,
        lab.difficulty,
        lab.points,
        lab.steps.len()
    );
    println!("Type /help for session commands.\n");
}

fn print_step(session: &LabSession) {
    let lab = &session.lab;
    if session.state.is_complete() {
        println!("Lab complete. Type /replay to play again.");
        return;
    }
    let index = session.state.step_index();
    let Some(step) = lab.step(index) else {
        println!("This lab has no steps yet.");
        return;
    };
    println!("Step {}/{}: {}", index + 1, lab.steps.len(), step.title);
    if !step.content.is_empty() {
        println!("{}", step.content);
    }
    println!("Q: {}", step.question);
}

fn print_hint(session: &LabSession) {
    let hint = session
        .lab
        .step(session.state.step_index())
        .and_then(|s| s.hint.as_deref());
    match hint {
        Some(hint) => println!("Hint: {hint}"),
        None => println!("No hint for this step."),
    }
}

fn print_delta(delta: &TranscriptDelta, color: ColorChoice) {
    let ansi = match color {
        ColorChoice::Auto => std::io::stdout().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };
    if delta.cleared && ansi {
        print!("\x1b[2J\x1b[H");
    }
    for line in &delta.appended {
        if line.kind != LineKind::Input {
            println!("{}", line.content);
        }
    }
}

fn prompt(user: &User, session: &LabSession) -> Result<()> {
    print!("{}@cyberlabs:{}$ ", user.name, session.directory);
    std::io::stdout().flush()?;
    Ok(())
}
