//! Recovery of a JSON object or array from free-form model output.
//!
//! Model answers are not guaranteed to be bare JSON: they may wrap it in
//! prose, in a fenced code block, or both. [`extract_json`] tries, in order:
//!
//! 1. the whole text,
//! 2. the interior of each fenced block (optionally tagged `json`),
//! 3. each balanced bracket span, in order of its opening bracket.
//!
//! The first candidate that parses as the requested [`Shape`] wins. A value
//! of the other shape never counts as a match.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ExtractionError;

const SNIPPET_CHARS: usize = 200;

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*(?:json|JSON)?[ \t]*\r?\n?(.*?)```").expect("valid fence regex")
});

/// The top-level JSON type a caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Object,
    Array,
}

impl Shape {
    fn matches(self, value: &Value) -> bool {
        match self {
            Shape::Object => value.is_object(),
            Shape::Array => value.is_array(),
        }
    }

    fn brackets(self) -> (u8, u8) {
        match self {
            Shape::Object => (b'{', b'}'),
            Shape::Array => (b'[', b']'),
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::Object => write!(f, "object"),
            Shape::Array => write!(f, "array"),
        }
    }
}

/// Locate and parse a JSON value of `shape` inside `text`.
///
/// # Errors
///
/// Returns [`ExtractionError`] when no candidate parses as `shape`.
pub fn extract_json(text: &str, shape: Shape) -> Result<Value, ExtractionError> {
    if let Some(value) = parse_as(text, shape) {
        return Ok(value);
    }

    for cap in FENCE_RE.captures_iter(text) {
        let interior = cap.get(1).map_or("", |m| m.as_str());
        if let Some(value) = parse_as(interior, shape) {
            return Ok(value);
        }
    }

    let (open, close) = shape.brackets();
    for span in BalancedSpans::new(text, open, close) {
        if let Some(value) = parse_as(span, shape) {
            return Ok(value);
        }
    }

    Err(ExtractionError {
        shape,
        reason: "no parseable candidate".to_string(),
        snippet: snippet(text),
    })
}

/// [`extract_json`] followed by typed deserialization.
///
/// # Errors
///
/// Returns [`ExtractionError`] when extraction fails or the value does not
/// deserialize into `T`.
pub fn extract_as<T: DeserializeOwned>(text: &str, shape: Shape) -> Result<T, ExtractionError> {
    let value = extract_json(text, shape)?;
    serde_json::from_value(value).map_err(|e| ExtractionError {
        shape,
        reason: e.to_string(),
        snippet: snippet(text),
    })
}

fn parse_as(candidate: &str, shape: Shape) -> Option<Value> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    shape.matches(&value).then_some(value)
}

fn snippet(text: &str) -> String {
    let mut out: String = text.chars().take(SNIPPET_CHARS).collect();
    if text.chars().nth(SNIPPET_CHARS).is_some() {
        out.push('…');
    }
    out
}

/// Iterator over balanced `open … close` spans, one per opening bracket.
///
/// Brackets inside JSON string literals (including escaped quotes) are
/// ignored. Scanning is bytewise; the delimiters are ASCII, so every yielded
/// span starts and ends on a UTF-8 boundary.
struct BalancedSpans<'a> {
    text: &'a str,
    open: u8,
    close: u8,
    cursor: usize,
}

impl<'a> BalancedSpans<'a> {
    fn new(text: &'a str, open: u8, close: u8) -> Self {
        Self {
            text,
            open,
            close,
            cursor: 0,
        }
    }

    fn span_from(&self, start: usize) -> Option<&'a str> {
        let bytes = self.text.as_bytes();
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (offset, &b) in bytes[start..].iter().enumerate() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
                continue;
            }
            if b == b'"' {
                in_string = true;
            } else if b == self.open {
                depth += 1;
            } else if b == self.close {
                depth -= 1;
                if depth == 0 {
                    return Some(&self.text[start..=start + offset]);
                }
            }
        }
        None
    }
}

impl<'a> Iterator for BalancedSpans<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();
        while self.cursor < bytes.len() {
            let start = self.cursor;
            self.cursor += 1;
            if bytes[start] != self.open {
                continue;
            }
            if let Some(span) = self.span_from(start) {
                return Some(span);
            }
        }
        None
    }
}
