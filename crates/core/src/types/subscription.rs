//! Subscription lists scope which catalog items this integration sees.

use serde::{Deserialize, Serialize};

use super::id::SupplierId;

/// A catalog source list paired with the supplier that sources it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionList {
    pub list_id: String,
    pub supplier_id: SupplierId,
}

impl SubscriptionList {
    #[must_use]
    pub fn new(list_id: impl Into<String>, supplier_id: i64) -> Self {
        Self {
            list_id: list_id.into(),
            supplier_id: SupplierId::new(supplier_id),
        }
    }

    /// JSON form attached to documents as `ncSubscriptionList`.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "listId": self.list_id,
            "supplierId": self.supplier_id,
        })
    }

    /// Whether a `SourceIds` array contains this list.
    #[must_use]
    pub fn sources(&self, source_ids: Option<&serde_json::Value>) -> bool {
        source_ids
            .and_then(serde_json::Value::as_array)
            .is_some_and(|ids| ids.iter().any(|id| id.as_str() == Some(self.list_id.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_value() {
        let list = SubscriptionList::new("list-1", 7187);
        assert_eq!(list.to_value(), json!({"listId": "list-1", "supplierId": 7187}));
    }

    #[test]
    fn test_sources() {
        let list = SubscriptionList::new("list-1", 7187);
        assert!(list.sources(Some(&json!(["other", "list-1"]))));
        assert!(!list.sources(Some(&json!(["other"]))));
        assert!(!list.sources(Some(&json!("list-1"))));
        assert!(!list.sources(None));
    }
}
