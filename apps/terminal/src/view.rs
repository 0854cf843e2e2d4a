//! Text rendering of session snapshots and parsing of typed commands.

use client_core::{PrimaryAction, SessionView};

pub const CODE_PROMPT: &str = "고유번호를 입력하세요";
pub const ROLL_LABEL: &str = "주사위 굴리기";
pub const ADD_CHANCE_LABEL: &str = "1,000원으로 한 번 더 굴리기";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Roll,
    AddChance,
    Help,
    Quit,
    Unknown(String),
}

/// `quit`/`q` and `help`/`h`/`?` work in every phase. Otherwise, while
/// logged out every line is an identity code, as typed; once logged in, an
/// empty line presses the primary button.
pub fn parse_command(line: &str, view: &SessionView) -> Command {
    let trimmed = line.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "quit" | "q" => return Command::Quit,
        "help" | "h" | "?" => return Command::Help,
        _ => {}
    }

    if view.session.is_none() {
        return Command::Login(line.to_string());
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (trimmed, ""),
    };
    match word.to_ascii_lowercase().as_str() {
        "" => match view.primary_action() {
            PrimaryAction::AddChance => Command::AddChance,
            _ => Command::Roll,
        },
        "roll" | "r" => Command::Roll,
        "add" | "a" => Command::AddChance,
        "login" => Command::Login(rest.to_string()),
        _ => Command::Unknown(trimmed.to_string()),
    }
}

pub fn render(view: &SessionView) -> Vec<String> {
    let mut lines: Vec<String> = view.status.lines().map(str::to_string).collect();

    if view.session.is_some() {
        if view.animating {
            lines.push("[ ? ]".to_string());
        } else if let Some(face) = view.roll_outcome {
            lines.push(format!("{face} 🎲"));
        }
    }

    match view.primary_action() {
        PrimaryAction::Login => lines.push(format!("> {CODE_PROMPT}")),
        PrimaryAction::Roll { enabled: true } => lines.push(format!("> [Enter] {ROLL_LABEL}")),
        PrimaryAction::Roll { enabled: false } => {}
        PrimaryAction::AddChance => lines.push(format!("> [Enter] {ADD_CHANCE_LABEL}")),
    }

    lines
}

pub fn help_text() -> &'static str {
    "type your code to log in; then roll (r), add (a), login <code>, or Enter for the button; \
     help (h) and quit (q) work anywhere"
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
