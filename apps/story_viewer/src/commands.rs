//! Gesture commands typed into the terminal viewer.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerCommand {
    Hold,
    Release { dx: f32, dy: f32 },
    Next,
    Prev,
    Status,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try hold, release <dx> [dy], next, prev, status, quit)")]
    Unknown(String),
    #[error("invalid displacement '{0}'")]
    InvalidDelta(String),
    #[error("release needs a horizontal displacement: release <dx> [dy]")]
    MissingDelta,
}

pub fn parse_command(line: &str) -> Result<ViewerCommand, CommandError> {
    let mut parts = line.split_whitespace();
    let Some(name) = parts.next() else {
        return Err(CommandError::Empty);
    };

    match name.to_ascii_lowercase().as_str() {
        "hold" | "h" => Ok(ViewerCommand::Hold),
        "release" | "r" => {
            let dx = parse_delta(parts.next().ok_or(CommandError::MissingDelta)?)?;
            let dy = parts.next().map(parse_delta).transpose()?.unwrap_or(0.0);
            Ok(ViewerCommand::Release { dx, dy })
        }
        "next" | "n" | "tap" => Ok(ViewerCommand::Next),
        "prev" | "p" | "back" => Ok(ViewerCommand::Prev),
        "status" | "s" => Ok(ViewerCommand::Status),
        "quit" | "q" | "close" => Ok(ViewerCommand::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_delta(raw: &str) -> Result<f32, CommandError> {
    raw.parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandError::InvalidDelta(raw.to_string()))
}
