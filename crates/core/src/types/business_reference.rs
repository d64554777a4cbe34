//! Business-reference extraction.
//!
//! The hub matches records by a vendor-agnostic key built from configured
//! document paths, e.g. `["id", "invoiceNumber"]` → `"42.INV-0001"`.

use serde_json::Value;

const SEPARATOR: &str = ".";

/// Build a business reference from dotted paths into `doc`.
///
/// Missing or null values contribute an empty segment; strings are used
/// as-is and other scalars are rendered as JSON.
#[must_use]
pub fn extract_business_reference<S: AsRef<str>>(paths: &[S], doc: &Value) -> String {
    paths
        .iter()
        .map(|path| lookup(doc, path.as_ref()).map(render).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
