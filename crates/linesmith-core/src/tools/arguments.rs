//! Recovery of tool-call arguments
//!
//! Models often emit tool-call payloads that are not valid JSON (raw
//! newlines inside strings, truncated objects). Code is recovered by trying
//! a fixed sequence of strategies and taking the first hit.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static QUOTED_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""code"\s*:\s*"((?:\\.|[^"\\])*)""#).ok());

static UNQUOTED_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""code"\s*:\s*([^}]+)"#).ok());

/// Outcome of a single strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Code recovered
    Found(String),
    /// The payload was understood and holds no usable code; stop here
    Absent,
    /// This strategy could not read the payload; try the next one
    Unreadable,
}

/// Ways of pulling the `code` field out of a raw payload, in the order
/// they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentStrategy {
    /// Decode the whole payload as JSON
    Structured,
    /// `"code": "<escaped string>"`
    QuotedField,
    /// `"code": <anything up to a closing brace>`
    UnquotedField,
}

impl ArgumentStrategy {
    pub const ORDER: [ArgumentStrategy; 3] = [
        ArgumentStrategy::Structured,
        ArgumentStrategy::QuotedField,
        ArgumentStrategy::UnquotedField,
    ];

    pub fn extract(self, raw: &str) -> Extraction {
        match self {
            ArgumentStrategy::Structured => match serde_json::from_str::<Value>(raw) {
                Ok(value) => match value.get("code").and_then(Value::as_str) {
                    Some(code) if !code.is_empty() => Extraction::Found(code.to_string()),
                    _ => Extraction::Absent,
                },
                Err(_) => Extraction::Unreadable,
            },
            ArgumentStrategy::QuotedField => capture(&QUOTED_CODE, raw),
            ArgumentStrategy::UnquotedField => capture(&UNQUOTED_CODE, raw),
        }
    }
}

fn capture(pattern: &LazyLock<Option<Regex>>, raw: &str) -> Extraction {
    let Some(regex) = pattern.as_ref() else {
        return Extraction::Unreadable;
    };
    match regex.captures(raw).and_then(|caps| caps.get(1)) {
        Some(m) if m.as_str().is_empty() => Extraction::Absent,
        Some(m) => Extraction::Found(unescape(m.as_str())),
        None => Extraction::Unreadable,
    }
}

/// Only `\n` and `\t` are rewritten; other escapes stay literal.
fn unescape(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\t", "\t")
}

/// Best-effort extraction of the `code` argument. Never fails; returns
/// `None` when no usable code can be recovered.
pub fn extract_code(raw: &str) -> Option<String> {
    for strategy in ArgumentStrategy::ORDER {
        match strategy.extract(raw) {
            Extraction::Found(code) => return Some(code),
            Extraction::Absent => return None,
            Extraction::Unreadable => continue,
        }
    }
    None
}

/// Strict decode for provider tools. An empty payload means no arguments.
pub fn parse_structured_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
}
