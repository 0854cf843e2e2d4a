//! Feeds typed lines to the controller and renders every published frame.

use std::{collections::VecDeque, future::Future, io::Write};

use client_core::{SessionController, SessionView};
use shared::error::SessionError;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::view::{help_text, parse_command, render, Command};

/// Runs until the player quits or input ends. Lines that arrive while the
/// dice are rolling are dropped, the same as clicks on a disabled button;
/// lines that arrive during other requests wait their turn.
pub async fn drive<W: Write>(
    controller: &mut SessionController,
    frames: &mut UnboundedReceiver<SessionView>,
    input: &mut UnboundedReceiver<String>,
    out: &mut W,
) -> anyhow::Result<()> {
    let mut pending = VecDeque::new();
    write_view(out, &controller.view())?;

    loop {
        let line = match pending.pop_front() {
            Some(line) => line,
            None => match input.recv().await {
                Some(line) => line,
                None => break,
            },
        };

        let outcome = match parse_command(&line, &controller.view()) {
            Command::Quit => break,
            Command::Help => {
                writeln!(out, "{}", help_text())?;
                continue;
            }
            Command::Unknown(word) => {
                writeln!(out, "unknown command '{word}'; {}", help_text())?;
                continue;
            }
            Command::Login(code) => {
                run_operation(controller.login(&code), frames, input, &mut pending, out).await?
            }
            Command::Roll => {
                let roll = async { controller.roll_dice().await.map(|_| ()) };
                run_operation(roll, frames, input, &mut pending, out).await?
            }
            Command::AddChance => {
                let add = async { controller.add_chance().await.map(|_| ()) };
                run_operation(add, frames, input, &mut pending, out).await?
            }
        };
        if let Err(error) = outcome {
            debug!(%error, "operation ended with an error status");
        }
    }

    Ok(())
}

async fn run_operation<F, W>(
    operation: F,
    frames: &mut UnboundedReceiver<SessionView>,
    input: &mut UnboundedReceiver<String>,
    pending: &mut VecDeque<String>,
    out: &mut W,
) -> anyhow::Result<Result<(), SessionError>>
where
    F: Future<Output = Result<(), SessionError>>,
    W: Write,
{
    tokio::pin!(operation);
    let mut animating = false;
    let mut input_open = true;

    let outcome = loop {
        tokio::select! {
            biased;
            outcome = &mut operation => break outcome,
            Some(view) = frames.recv() => {
                animating = view.animating;
                write_view(out, &view)?;
            }
            line = input.recv(), if input_open => match line {
                Some(line) if animating => debug!(%line, "ignored input while the dice are rolling"),
                Some(line) => pending.push_back(line),
                None => input_open = false,
            },
        }
    };

    while let Ok(view) = frames.try_recv() {
        write_view(out, &view)?;
    }
    Ok(outcome)
}

fn write_view<W: Write>(out: &mut W, view: &SessionView) -> std::io::Result<()> {
    for line in render(view) {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
