//! Best-effort structured decoding of free model text.
//!
//! Models asked for JSON often wrap it in prose or code fences. The span
//! from the first `{` to the last `}` is decoded; anything else is kept as
//! raw text so callers always get one of two explicit shapes.

use serde_json::{Map, Value};
use tracing::debug;

/// Outcome of [`extract_structured`].
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// The brace-delimited span parsed as JSON.
    Structured(Value),
    /// No parseable span; the original text.
    Raw(String),
}

impl Extracted {
    pub fn is_structured(&self) -> bool {
        matches!(self, Extracted::Structured(_))
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Extracted::Structured(value) => Some(value),
            Extracted::Raw(_) => None,
        }
    }

    /// Look up a top-level field of a structured object.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.as_structured()?.get(key)
    }

    /// A top-level field as text: strings as-is, other scalars stringified.
    /// Nulls, arrays and objects yield `None`.
    pub fn text_field(&self, key: &str) -> Option<String> {
        match self.field(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Collapse into a single value, wrapping raw text as `{"content": text}`.
    pub fn into_value(self) -> Value {
        match self {
            Extracted::Structured(value) => value,
            Extracted::Raw(text) => {
                let mut map = Map::new();
                map.insert("content".to_string(), Value::String(text));
                Value::Object(map)
            }
        }
    }
}

/// Decode the first-`{`-to-last-`}` span of `text`, falling back to raw text.
pub fn extract_structured(text: &str) -> Extracted {
    let span = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Extracted::Raw(text.to_string()),
    };

    match serde_json::from_str::<Value>(span) {
        Ok(value) => Extracted::Structured(value),
        Err(e) => {
            debug!(error = %e, "Model output did not contain parseable JSON");
            Extracted::Raw(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_embedded_object() {
        let extracted = extract_structured("prefix {\"a\":1} suffix");
        assert_eq!(extracted, Extracted::Structured(json!({"a": 1})));
    }

    #[test]
    fn test_plain_text_is_raw() {
        let extracted = extract_structured("no json here");
        assert_eq!(extracted, Extracted::Raw("no json here".to_string()));
        assert_eq!(extracted.into_value(), json!({"content": "no json here"}));
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let text = "Here you go:\n```json\n{\"name\": \"Mira\", \"age\": 31}\n```";
        let extracted = extract_structured(text);
        assert_eq!(extracted.text_field("name").as_deref(), Some("Mira"));
        assert_eq!(extracted.text_field("age").as_deref(), Some("31"));
    }

    #[test]
    fn test_span_is_greedy_across_nested_objects() {
        let text = r#"{"chapters": [{"title": "a"}, {"title": "b"}]} done"#;
        let extracted = extract_structured(text);
        let chapters = extracted.field("chapters").and_then(Value::as_array).unwrap();
        assert_eq!(chapters.len(), 2);
    }

    #[test]
    fn test_invalid_json_falls_back_to_raw() {
        let text = "broken {name: Mira} output";
        assert_eq!(extract_structured(text), Extracted::Raw(text.to_string()));
    }

    #[test]
    fn test_reversed_braces_are_raw() {
        assert!(!extract_structured("} then {").is_structured());
    }

    #[test]
    fn test_text_field_skips_null_and_containers() {
        let extracted = extract_structured(r#"{"a": null, "b": [1], "c": true}"#);
        assert_eq!(extracted.text_field("a"), None);
        assert_eq!(extracted.text_field("b"), None);
        assert_eq!(extracted.text_field("c").as_deref(), Some("true"));
        assert_eq!(extracted.text_field("missing"), None);
    }
}
