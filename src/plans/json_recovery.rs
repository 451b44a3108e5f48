// ABOUTME: Resilient JSON extraction from free-form model output in three escalating stages
// ABOUTME: Direct parse, textual repairs outside string literals, then bracket-balance recovery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Resilient JSON Parser
//!
//! Stages, in order of increasing aggressiveness:
//!
//! 1. **Direct**: strip markdown fences, take the largest brace-delimited
//!    substring and parse it as-is.
//! 2. **Repaired**: control characters inside strings are escaped or dropped,
//!    single and typographic quotes are normalised, then outside string
//!    literals unquoted keys are quoted, trailing commas removed and empty or
//!    non-JSON values patched to `null`.
//! 3. **Recovered**: a character scanner tracks string, escape and nesting
//!    state, cuts back to the last point where a value was complete (dropping
//!    a dangling string or half-written pair) and appends exactly the closers
//!    needed.
//!
//! Recovery only restores syntax; it never invents content.

use crate::errors::ParseError;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

/// Which stage produced the parsed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStage {
    /// Parsed without modification
    Direct,
    /// Parsed after textual repairs
    Repaired,
    /// Parsed after bracket-balance recovery of truncated output
    Recovered,
}

impl fmt::Display for RepairStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Direct => "direct",
            Self::Repaired => "repaired",
            Self::Recovered => "recovered",
        })
    }
}

/// A parsed value and the stage that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredJson {
    /// Parsed JSON
    pub value: Value,
    /// Stage that succeeded
    pub stage: RepairStage,
}

static SINGLE_QUOTED: LazyLock<Option<Regex>> = LazyLock::new(|| {
    // 'value' in key or value position: {'a': 'b'} or ['x', 'y']
    Regex::new(r#"([\{\[,:]\s*)'([^'"\\\n]*)'(\s*[:,\}\]])"#).ok()
});

static UNQUOTED_KEY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"([\{,]\s*)([A-Za-z_][A-Za-z0-9_\-]*)(\s*:)").ok());

static TRAILING_COMMA: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r",(\s*[\}\]])").ok());

static EMPTY_VALUE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r":(\s*)([,\}])").ok());

static NON_JSON_LITERAL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"([:\[,]\s*)(None|True|False|NaN|undefined)(\s*[,\}\]])").ok()
});

/// Parse JSON out of raw model text
///
/// # Errors
///
/// Returns a [`ParseError`] with the head and tail of `text` when no stage
/// yields valid JSON.
pub fn parse_model_json(text: &str) -> Result<RecoveredJson, ParseError> {
    let stripped = strip_fences(text);
    let Some(start) = stripped.find(['{', '[']) else {
        return Err(ParseError::from_text("no JSON object found", text));
    };
    let open_tail = &stripped[start..];
    let candidate = largest_delimited(open_tail);

    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Ok(RecoveredJson {
            value,
            stage: RepairStage::Direct,
        });
    }

    let repaired = apply_text_repairs(candidate);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        debug!(stage = %RepairStage::Repaired, "Model JSON needed textual repairs");
        return Ok(RecoveredJson {
            value,
            stage: RepairStage::Repaired,
        });
    }

    let balanced = balance_truncated(&apply_text_repairs(open_tail))
        .ok_or_else(|| ParseError::from_text("nothing recoverable before truncation", text))?;
    match serde_json::from_str::<Value>(&balanced) {
        Ok(value) => {
            debug!(
                stage = %RepairStage::Recovered,
                original_len = text.len(),
                recovered_len = balanced.len(),
                "Recovered truncated model JSON"
            );
            Ok(RecoveredJson {
                value,
                stage: RepairStage::Recovered,
            })
        }
        Err(e) => Err(ParseError::from_text(format!("recovery failed: {e}"), text)),
    }
}

fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// From the opening bracket to the last matching closer, or everything if none
fn largest_delimited(open_tail: &str) -> &str {
    let closer = if open_tail.starts_with('[') { ']' } else { '}' };
    open_tail
        .rfind(closer)
        .map_or(open_tail, |end| &open_tail[..=end])
}

/// Apply `outside` to every segment not inside a double-quoted string and
/// sanitise control characters inside strings
fn map_outside_strings(text: &str, outside: impl Fn(&str) -> String) -> String {
    let mut result = String::with_capacity(text.len());
    let mut segment = String::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
                result.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    result.push(c);
                }
                '"' => {
                    in_string = false;
                    result.push(c);
                }
                '\n' => result.push_str("\\n"),
                '\r' => result.push_str("\\r"),
                '\t' => result.push_str("\\t"),
                c if c.is_control() => {}
                c => result.push(c),
            }
        } else if c == '"' {
            result.push_str(&outside(&segment));
            segment.clear();
            in_string = true;
            result.push(c);
        } else if !c.is_control() || c.is_whitespace() {
            segment.push(c);
        }
    }
    if in_string {
        // Unterminated string: leave for the recovery stage
        result.push_str(&segment);
    } else {
        result.push_str(&outside(&segment));
    }
    result
}

fn replace_with(pattern: &LazyLock<Option<Regex>>, text: &str, replacement: &str) -> String {
    pattern.as_ref().map_or_else(
        || text.to_owned(),
        |re| re.replace_all(text, replacement).into_owned(),
    )
}

fn normalise_typographic_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Runs on text outside double-quoted strings only, so apostrophes inside
/// real string values are never touched
fn double_single_quotes(segment: &str) -> String {
    let mut text = segment.to_owned();
    // Adjacent single-quoted tokens share a delimiter, so repeat until stable
    for _ in 0..4 {
        let next = replace_with(&SINGLE_QUOTED, &text, "$1\"$2\"$3");
        if next == text {
            break;
        }
        text = next;
    }
    text
}

fn repair_segment(segment: &str) -> String {
    let quoted = replace_with(&UNQUOTED_KEY, segment, "$1\"$2\"$3");
    let literals = NON_JSON_LITERAL.as_ref().map_or_else(
        || quoted.clone(),
        |re| {
            re.replace_all(&quoted, |caps: &Captures| {
                let literal = match &caps[2] {
                    "True" => "true",
                    "False" => "false",
                    _ => "null",
                };
                format!("{}{literal}{}", &caps[1], &caps[3])
            })
            .into_owned()
        },
    );
    let without_trailing = replace_with(&TRAILING_COMMA, &literals, "$1");
    replace_with(&EMPTY_VALUE, &without_trailing, ": null$1$2")
}

/// Stage 2 textual repairs
#[must_use]
pub fn apply_text_repairs(text: &str) -> String {
    let requoted = map_outside_strings(&normalise_typographic_quotes(text), double_single_quotes);
    // Second pass sees the requoted values as strings and leaves them alone
    map_outside_strings(&requoted, repair_segment)
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    closer: char,
    awaiting_key: bool,
}

/// Last position where cutting the output leaves only complete values
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    len: usize,
    depth: usize,
}

#[derive(Debug, Default)]
struct BracketScanner {
    out: String,
    stack: Vec<Frame>,
    in_string: bool,
    escaped: bool,
    string_is_key: bool,
    token_open: bool,
    checkpoint: Option<Checkpoint>,
}

impl BracketScanner {
    fn mark(&mut self) {
        self.checkpoint = Some(Checkpoint {
            len: self.out.len(),
            depth: self.stack.len(),
        });
    }

    fn finish_token(&mut self) {
        if self.token_open {
            self.token_open = false;
            self.mark();
        }
    }

    /// Feed one character; returns false once the top-level value closed or
    /// the input stopped making structural sense
    fn feed(&mut self, c: char) -> bool {
        if self.in_string {
            self.out.push(c);
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
                if !self.string_is_key {
                    self.mark();
                }
            }
            return true;
        }

        match c {
            '"' => {
                self.finish_token();
                self.string_is_key = self.stack.last().is_some_and(|f| f.awaiting_key);
                self.in_string = true;
                self.out.push(c);
            }
            '{' | '[' => {
                self.finish_token();
                self.stack.push(Frame {
                    closer: if c == '{' { '}' } else { ']' },
                    awaiting_key: c == '{',
                });
                self.out.push(c);
                self.mark();
            }
            '}' | ']' => {
                self.finish_token();
                match self.stack.last() {
                    Some(frame) if frame.closer == c => {
                        self.stack.pop();
                        self.out.push(c);
                        self.mark();
                        return !self.stack.is_empty();
                    }
                    _ => return false,
                }
            }
            ',' => {
                self.finish_token();
                if let Some(frame) = self.stack.last_mut() {
                    frame.awaiting_key = frame.closer == '}';
                }
                self.out.push(c);
            }
            ':' => {
                self.finish_token();
                if let Some(frame) = self.stack.last_mut() {
                    frame.awaiting_key = false;
                }
                self.out.push(c);
            }
            c if c.is_whitespace() => {
                self.finish_token();
                self.out.push(c);
            }
            c => {
                self.token_open = true;
                self.out.push(c);
            }
        }
        true
    }

    fn into_balanced(mut self) -> Option<String> {
        if self.stack.is_empty() && !self.in_string && self.checkpoint.is_some() {
            return Some(self.out);
        }
        // A token still open at end of input may itself be truncated
        let checkpoint = self.checkpoint?;
        self.out.truncate(checkpoint.len);
        let trimmed_len = self.out.trim_end().trim_end_matches(',').len();
        self.out.truncate(trimmed_len);
        for frame in self.stack[..checkpoint.depth].iter().rev() {
            self.out.push(frame.closer);
        }
        Some(self.out)
    }
}

/// Stage 3: close a truncated document at its last complete value
#[must_use]
pub fn balance_truncated(text: &str) -> Option<String> {
    let mut scanner = BracketScanner::default();
    let mut started = false;
    for c in text.chars() {
        if !started {
            if c != '{' && c != '[' {
                continue;
            }
            started = true;
        }
        if !scanner.feed(c) {
            break;
        }
    }
    scanner.into_balanced()
}
