//! Pure input parsing for the interactive menu.
//!
//! Kept free of stdin so the accept/reject rules are unit-testable; the
//! binary owns the prompt/retry loop.

use thiserror::Error;

/// Top-level menu actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// Prompt for parameters and request a run.
    NewSimulation,
    /// Connect to an already running server without starting anything.
    ConnectOnly,
    /// Send QUIT and exit.
    Quit,
}

/// Errors produced by a single input line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MenuError {
    #[error("not a number: {0:?}")]
    NotANumber(String),

    #[error("{value} is outside [{min}..{max}]")]
    OutOfRange { value: i64, min: i64, max: i64 },
}

/// Parses a menu choice. `None` means the input matched no menu entry.
pub fn parse_choice(input: &str) -> Option<MenuChoice> {
    match input.trim() {
        "1" => Some(MenuChoice::NewSimulation),
        "2" => Some(MenuChoice::ConnectOnly),
        "3" => Some(MenuChoice::Quit),
        _ => None,
    }
}

/// Parses a bounded integer answer. An empty line means "take the default";
/// anything else must parse as an integer inside `[min, max]`.
pub fn parse_bounded(input: &str, min: i64, max: i64, default: i64) -> Result<i64, MenuError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    let value: i64 = trimmed
        .parse()
        .map_err(|_| MenuError::NotANumber(trimmed.to_string()))?;
    if value < min || value > max {
        return Err(MenuError::OutOfRange { value, min, max });
    }
    Ok(value)
}
