//! PGN game parsing.
//!
//! Parses one raw game text into the header fields the pipeline persists.
//! Parse errors are permanent by definition: the same text redelivered
//! will fail the same way, so the worker never retries them.

mod worker;

pub use worker::{ChunkDisposition, ChunkWorker};

use crate::error::{GameParseError, MalformedHeaderSnafu};
use snafu::prelude::*;

/// Game-termination markers, per the PGN export format.
const RESULT_TOKENS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Placeholder for header values PGN leaves unknown.
const UNKNOWN: &str = "?";

/// The fields extracted from one well-formed game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGame {
    pub white: String,
    pub black: String,
    pub event: String,
    pub result: String,
}

/// Parse one raw game text.
///
/// A game is well-formed when it has at least one valid `[Tag "Value"]`
/// header line and movetext terminated by a result token. Missing
/// individual tags fall back to PGN's `?` placeholder; a structurally
/// broken header line or absent result is a permanent error.
pub fn parse_game(raw: &str) -> Result<ParsedGame, GameParseError> {
    let trimmed = raw.trim();
    ensure!(!trimmed.is_empty(), crate::error::EmptyGameSnafu);

    let mut white = None;
    let mut black = None;
    let mut event = None;
    let mut header_count = 0u32;
    let mut last_movetext_line = None;

    for line in trimmed.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('[') {
            let (tag, value) = parse_header(line)?;
            header_count += 1;
            match tag {
                "White" => white = Some(value),
                "Black" => black = Some(value),
                "Event" => event = Some(value),
                _ => {}
            }
        } else {
            last_movetext_line = Some(line);
        }
    }

    ensure!(header_count > 0, crate::error::MissingHeadersSnafu);

    let result = last_movetext_line
        .and_then(|line| line.split_whitespace().next_back())
        .filter(|token| RESULT_TOKENS.contains(token))
        .context(crate::error::MissingResultSnafu)?;

    Ok(ParsedGame {
        white: white.unwrap_or_else(|| UNKNOWN.to_string()),
        black: black.unwrap_or_else(|| UNKNOWN.to_string()),
        event: event.unwrap_or_else(|| UNKNOWN.to_string()),
        result: result.to_string(),
    })
}

/// Parse a `[Tag "Value"]` header line into its tag and value.
fn parse_header(line: &str) -> Result<(&str, String), GameParseError> {
    let inner = line
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .context(MalformedHeaderSnafu { line })?;

    let (tag, rest) = inner
        .split_once(char::is_whitespace)
        .context(MalformedHeaderSnafu { line })?;

    let value = rest
        .trim()
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .context(MalformedHeaderSnafu { line })?;

    Ok((tag, value.to_string()))
}
