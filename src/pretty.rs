//! Jsonmend - Recursive JSON pretty-printer
//!
//! Produces the canonical 2-space-indented form used for training targets.
//! String values that are themselves JSON-encoded (possibly several layers
//! deep) are expanded into real nested structure before printing, so ground
//! truth never hides an object inside a quoted blob.

use std::fmt;

use serde_json::Value;

/// Unwrap attempts per string before giving up on pathological nesting.
const MAX_UNWRAP_ATTEMPTS: usize = 10;

/// Top-level input was not syntactically valid JSON.
///
/// This is the only error the printer produces. Parse failures during
/// embedded-string expansion are a normal "not embedded" signal and never
/// surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    /// Parser diagnostic, human readable.
    pub message: String,
    /// 1-indexed line of the failure.
    pub line: usize,
    /// 1-indexed column of the failure.
    pub column: usize,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Input is not valid JSON: {} (line {}, column {})",
            self.message, self.line, self.column
        )
    }
}

impl std::error::Error for FormatError {}

impl From<serde_json::Error> for FormatError {
    fn from(e: serde_json::Error) -> Self {
        Self {
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
        }
    }
}

/// Pretty-print a JSON document with 2-space indentation.
///
/// Key order is preserved exactly as it appears in the input, and non-ASCII
/// characters are emitted literally rather than as `\uXXXX` escapes. Any
/// string value that parses (possibly through several encoding layers) down
/// to an object or array is replaced by that structure.
pub fn prettify(input: &str) -> Result<String, FormatError> {
    let root: Value = serde_json::from_str(input).map_err(FormatError::from)?;
    let expanded = expand_value(root);
    Ok(serde_json::to_string_pretty(&expanded).expect("parsed JSON should be re-serializable"))
}

/// Whether `input` is syntactically valid JSON.
///
/// Runs the same parse-and-reserialize path as [`prettify`]; no side effects.
pub fn is_valid(input: &str) -> bool {
    prettify(input).is_ok()
}

/// Depth-first expansion walk. Builds new containers bottom-up rather than
/// mutating in place, so the original tree is never aliased mid-transform.
fn expand_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| (key, expand_value(val)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(expand_value).collect()),
        Value::String(s) => match unwrap_embedded(&s) {
            Some(container) => expand_value(container),
            None => Value::String(s),
        },
        other => other,
    }
}

/// Try to unwrap JSON that has been embedded as a string, possibly multiple
/// times. Commits only if the final result is an object or array; a string
/// that merely starts with `{`, `[`, or `"` but does not parse, or that
/// parses only down to a scalar, yields `None` and stays untouched.
fn unwrap_embedded(s: &str) -> Option<Value> {
    let mut current = Value::String(s.to_owned());

    for _ in 0..MAX_UNWRAP_ATTEMPTS {
        let text = match &current {
            Value::String(t) => t.trim(),
            _ => break,
        };
        if text.is_empty() {
            break;
        }
        // Cheap rejection: ordinary prose never starts like a container or a
        // double-encoded string, so skip the parse attempt entirely.
        if !matches!(text.as_bytes()[0], b'{' | b'[' | b'"') {
            break;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(parsed) => current = parsed,
            Err(_) => break,
        }
    }

    match current {
        Value::Object(_) | Value::Array(_) => Some(current),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_pretty_print() {
        let out = prettify(r#"{"a":1,"b":[true,null]}"#).unwrap();
        assert_eq!(out, "{\n  \"a\": 1,\n  \"b\": [\n    true,\n    null\n  ]\n}");
    }

    #[test]
    fn test_idempotent() {
        let first = prettify(r#"{"a": "{\"x\":1}", "b": [1, 2]}"#).unwrap();
        let second = prettify(&first).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_key_order_preserved() {
        let out = prettify(r#"{"zebra": 1, "apple": 2, "mango": 3}"#).unwrap();
        let zebra = out.find("zebra").unwrap();
        let apple = out.find("apple").unwrap();
        let mango = out.find("mango").unwrap();
        assert!(zebra < apple && apple < mango);
    }

    #[test]
    fn test_non_ascii_unescaped() {
        let out = prettify("{\"note\": \"it\u{2019}s fine\"}").unwrap();
        assert!(out.contains('\u{2019}'));
        assert!(!out.contains("\\u2019"));
    }

    #[test]
    fn test_embedded_single_level() {
        let out = prettify(r#"{"a": "{\"x\":1}"}"#).unwrap();
        assert_eq!(out, "{\n  \"a\": {\n    \"x\": 1\n  }\n}");
    }

    #[test]
    fn test_embedded_double_encoded() {
        // A string whose content is itself a JSON string containing {"x":1}.
        let once = serde_json::to_string(r#"{"x":1}"#).unwrap();
        let doc = format!(r#"{{"a": {}}}"#, serde_json::to_string(&once).unwrap());
        let out = prettify(&doc).unwrap();
        assert_eq!(out, "{\n  \"a\": {\n    \"x\": 1\n  }\n}");
    }

    #[test]
    fn test_embedded_array() {
        let out = prettify(r#"{"a": "[1, 2]"}"#).unwrap();
        assert_eq!(out, "{\n  \"a\": [\n    1,\n    2\n  ]\n}");
    }

    #[test]
    fn test_not_json_string_unchanged() {
        let out = prettify(r#"{"a": "{not json}"}"#).unwrap();
        assert_eq!(out, "{\n  \"a\": \"{not json}\"\n}");
    }

    #[test]
    fn test_scalar_embedding_unchanged() {
        // Strings that parse down to scalars keep their original form.
        let out = prettify(r#"{"n": "42", "q": "\"hello\""}"#).unwrap();
        assert!(out.contains(r#""n": "42""#));
        assert!(out.contains(r#""q": "\"hello\"""#));
    }

    #[test]
    fn test_unwrap_cap_at_ten_layers() {
        let mut text = String::from(r#"{"x":1}"#);
        for _ in 0..10 {
            text = serde_json::to_string(&text).unwrap();
        }
        // Ten encoding layers need exactly ten parses: fully expands.
        let doc = format!(r#"{{"a": {}}}"#, text);
        let out = prettify(&doc).unwrap();
        assert!(out.contains("\"x\": 1"));

        // One more layer exceeds the cap: the string survives unchanged.
        let deeper = serde_json::to_string(&text).unwrap();
        let doc = format!(r#"{{"a": {}}}"#, deeper);
        let out = prettify(&doc).unwrap();
        assert!(!out.contains("\"x\": 1"));
        // Still a string value, not a container.
        assert!(out.starts_with("{\n  \"a\": \""));
    }

    #[test]
    fn test_invalid_top_level() {
        let err = prettify("{a: 1").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.column > 0);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_number_form_preserved() {
        let out = prettify(r#"{"int": 1, "float": 1.0}"#).unwrap();
        assert!(out.contains("\"int\": 1,"));
        assert!(out.contains("\"float\": 1.0"));
    }

    #[test]
    fn test_nested_expansion_inside_expanded_container() {
        // The unwrapped container is walked again, so embedded strings
        // inside it also expand.
        let inner = r#"{"deep": "{\"y\":2}"}"#;
        let doc = format!(r#"{{"a": {}}}"#, serde_json::to_string(inner).unwrap());
        let out = prettify(&doc).unwrap();
        assert!(out.contains("\"y\": 2"));
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid(r#"{"a": 1}"#));
        assert!(is_valid("[1, 2, 3]"));
        assert!(!is_valid("{a: 1"));
        assert!(!is_valid(""));
    }
}
