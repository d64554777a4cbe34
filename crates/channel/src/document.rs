//! Helpers for vendor documents.
//!
//! Vendor responses are passed through to the hub largely untouched, so they
//! stay as JSON objects rather than typed structs. These helpers cover the
//! handful of shape checks and merges the operation handlers need.

use serde_json::{Map, Value};

/// A vendor or hub document.
pub type Document = Map<String, Value>;

#[must_use]
pub fn is_non_empty_string(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.trim().is_empty())
}

#[must_use]
pub fn is_non_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(|o| !o.is_empty())
}

#[must_use]
pub fn is_non_empty_array(value: &Value) -> bool {
    value.as_array().is_some_and(|a| !a.is_empty())
}

/// Integral numbers, including floats with no fractional part.
#[must_use]
pub fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

/// Field accessors and merges for documents.
pub trait DocumentExt {
    /// Non-empty string field.
    fn str_field(&self, key: &str) -> Option<&str>;

    /// Array field (empty slice when absent or not an array).
    fn array_field(&self, key: &str) -> &[Value];

    /// Object field.
    fn object_field(&self, key: &str) -> Option<&Document>;

    /// Identifier field rendered as a string.
    ///
    /// Vendor ids arrive as numbers or strings; blanks count as absent.
    fn id_field(&self, key: &str) -> Option<String>;

    /// Overlay every key of `other` onto this document.
    fn merge(&mut self, other: &Document);
}

impl DocumentExt for Document {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
    }

    fn array_field(&self, key: &str) -> &[Value] {
        self.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default()
    }

    fn object_field(&self, key: &str) -> Option<&Document> {
        self.get(key).and_then(Value::as_object)
    }

    fn id_field(&self, key: &str) -> Option<String> {
        self.get(key).and_then(id_string)
    }

    fn merge(&mut self, other: &Document) {
        for (key, value) in other {
            self.insert(key.clone(), value.clone());
        }
    }
}

/// Render a JSON id (number or non-blank string) as a string.
#[must_use]
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Take the object out of a value, or an empty document.
#[must_use]
pub fn into_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Remote id resolution: the document's own field, else the first non-blank fallback.
#[must_use]
pub fn resolve_id(doc: &Document, key: &str, fallbacks: &[Option<&str>]) -> Option<String> {
    doc.id_field(key).or_else(|| {
        fallbacks
            .iter()
            .flatten()
            .find(|id| !id.trim().is_empty())
            .map(|id| (*id).to_string())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_predicates() {
        assert!(is_non_empty_string(&json!("a")));
        assert!(!is_non_empty_string(&json!("  ")));
        assert!(is_non_empty_object(&json!({"a": 1})));
        assert!(!is_non_empty_object(&json!({})));
        assert!(is_non_empty_array(&json!([1])));
        assert!(!is_non_empty_array(&json!([])));
        assert!(is_integer(&json!(7)));
        assert!(is_integer(&json!(7.0)));
        assert!(!is_integer(&json!(7.5)));
        assert!(!is_integer(&json!("7")));
    }

    #[test]
    fn test_merge_overlays_keys() {
        let mut doc = into_document(json!({"a": 1, "b": {"x": 1}}));
        doc.merge(&into_document(json!({"b": {"y": 2}, "c": 3})));
        assert_eq!(Value::Object(doc), json!({"a": 1, "b": {"y": 2}, "c": 3}));
    }

    #[test]
    fn test_id_field() {
        let doc = into_document(json!({"Id": 42, "Name": "", "Guid": "abc"}));
        assert_eq!(doc.id_field("Id").as_deref(), Some("42"));
        assert_eq!(doc.id_field("Guid").as_deref(), Some("abc"));
        assert!(doc.id_field("Name").is_none());
        assert!(doc.id_field("Missing").is_none());
    }

    #[test]
    fn test_resolve_id() {
        let doc = into_document(json!({"CustomerId": ""}));
        assert_eq!(
            resolve_id(&doc, "CustomerId", &[None, Some(" "), Some("c-2")]).as_deref(),
            Some("c-2")
        );
        let doc = into_document(json!({"CustomerId": "c-1"}));
        assert_eq!(resolve_id(&doc, "CustomerId", &[Some("c-2")]).as_deref(), Some("c-1"));
        assert!(resolve_id(&Document::new(), "Id", &[]).is_none());
    }

    #[test]
    fn test_accessors() {
        let doc = into_document(json!({"Items": [1, 2], "Meta": {"a": 1}, "Slug": "s"}));
        assert_eq!(doc.array_field("Items").len(), 2);
        assert!(doc.array_field("Slug").is_empty());
        assert!(doc.object_field("Meta").is_some());
        assert_eq!(doc.str_field("Slug"), Some("s"));
    }
}
