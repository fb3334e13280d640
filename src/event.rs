//! Trace record & codec.
//!
//! Defines the on-disk event schema (one JSON object per line) and its
//! encode/decode. See the top-level trace model: a trace is a dense,
//! monotonically-increasing sequence of [`Event`] values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel scope name for the outermost, non-procedure scope.
pub const MODULE_SCOPE: &str = "<module>";

/// One emitted trace record.
///
/// Field order here is the on-disk field order; `vars` is a `BTreeMap` so
/// that re-encoding the same event is byte-stable, even though variable-map
/// key order carries no semantic meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub step: u64,
    pub ts: f64,
    pub file: String,
    pub line: u32,
    pub col: u32,
    pub desc: String,
    pub depth: u32,
    pub scope: String,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

impl Event {
    /// Truncates `desc` to at most `max_len` columns, appending an ellipsis
    /// when truncated. Used both for the 80-column statement description and,
    /// with a different limit, for the summary's 30-column value truncation
    /// — the two callers intentionally use distinct constants.
    pub fn truncate_with_ellipsis(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            return s.to_string();
        }
        if max_len == 0 {
            return String::new();
        }
        let keep = max_len.saturating_sub(1);
        let mut out: String = s.chars().take(keep).collect();
        out.push('…');
        out
    }
}

/// Failure decoding a single trace line.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Encodes a single event as one newline-terminated JSON line.
pub fn encode(event: &Event) -> String {
    // `Event` derives `Serialize` with stable field order, so this is a
    // direct serialization — no re-encoding of already-stringified `vars`
    // values (they are plain `String`s already).
    serde_json::to_string(event).expect("Event serialization cannot fail")
}

/// Decodes one trace line into an [`Event`].
///
/// Unknown fields are ignored (`serde_json` does this by default when no
/// `deny_unknown_fields` attribute is present). Missing `vars` becomes an
/// empty map via `#[serde(default)]`.
pub fn decode(line: &str) -> Result<Event, CodecError> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    let obj = value
        .as_object()
        .ok_or_else(|| CodecError::MissingField("<object>"))?;

    for field in ["step", "ts", "file", "line", "col", "desc", "depth", "scope"] {
        if !obj.contains_key(field) {
            return Err(CodecError::MissingField(match field {
                "step" => "step",
                "ts" => "ts",
                "file" => "file",
                "line" => "line",
                "col" => "col",
                "desc" => "desc",
                "depth" => "depth",
                "scope" => "scope",
                _ => unreachable!(),
            }));
        }
    }

    let event: Event = serde_json::from_value(value)?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Event {
        let mut vars = BTreeMap::new();
        vars.insert("x".to_string(), "10".to_string());
        Event {
            step: 1,
            ts: 1000.5,
            file: "t.src".to_string(),
            line: 2,
            col: 0,
            desc: "x = x + 1".to_string(),
            depth: 0,
            scope: MODULE_SCOPE.to_string(),
            vars,
        }
    }

    #[test]
    fn round_trip() {
        let event = sample();
        let line = encode(&event);
        let decoded = decode(&line).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn decode_rejects_malformed_json() {
        assert!(decode("not json").is_err());
        assert!(decode("{\"step\": 1,").is_err());
    }

    #[test]
    fn decode_rejects_missing_scalar() {
        let line = r#"{"step":1,"ts":1.0,"file":"a","line":1,"col":0,"desc":"x"}"#;
        assert!(matches!(decode(line), Err(CodecError::MissingField("scope"))));
    }

    #[test]
    fn decode_defaults_missing_vars_to_empty() {
        let line = r#"{"step":0,"ts":1.0,"file":"a","line":1,"col":0,"desc":"x","depth":0,"scope":"<module>"}"#;
        let event = decode(line).unwrap();
        assert!(event.vars.is_empty());
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let line = r#"{"step":0,"ts":1.0,"file":"a","line":1,"col":0,"desc":"x","depth":0,"scope":"<module>","vars":{},"future_field":42}"#;
        assert!(decode(line).is_ok());
    }

    #[test]
    fn truncate_short_string_unchanged() {
        assert_eq!(Event::truncate_with_ellipsis("short", 80), "short");
    }

    #[test]
    fn truncate_long_string_gets_ellipsis() {
        let long = "x".repeat(100);
        let truncated = Event::truncate_with_ellipsis(&long, 80);
        assert_eq!(truncated.chars().count(), 80);
        assert!(truncated.ends_with('…'));
    }
}
