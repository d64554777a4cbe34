//! Payloads the hub sends to insert, update, and extract operations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A hub document plus the remote IDs the hub already knows for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub doc: Map<String, Value>,
    #[serde(rename = "customerRemoteID", default, skip_serializing_if = "Option::is_none")]
    pub customer_remote_id: Option<String>,
    #[serde(rename = "customerAddressRemoteID", default, skip_serializing_if = "Option::is_none")]
    pub customer_address_remote_id: Option<String>,
    #[serde(rename = "customerContactRemoteID", default, skip_serializing_if = "Option::is_none")]
    pub customer_contact_remote_id: Option<String>,
    #[serde(rename = "billingCustomerRemoteID", default, skip_serializing_if = "Option::is_none")]
    pub billing_customer_remote_id: Option<String>,
    #[serde(rename = "shippingCustomerRemoteID", default, skip_serializing_if = "Option::is_none")]
    pub shipping_customer_remote_id: Option<String>,
    #[serde(rename = "billingAddressRemoteID", default, skip_serializing_if = "Option::is_none")]
    pub billing_address_remote_id: Option<String>,
    #[serde(rename = "shippingAddressRemoteID", default, skip_serializing_if = "Option::is_none")]
    pub shipping_address_remote_id: Option<String>,
}

impl Payload {
    /// Payload wrapping a document with no remote IDs.
    #[must_use]
    pub fn from_doc(doc: Map<String, Value>) -> Self {
        Self {
            doc,
            ..Self::default()
        }
    }
}

/// Treat blank remote IDs as absent.
#[must_use]
pub fn non_blank(id: Option<&String>) -> Option<&str> {
    id.map(String::as_str).filter(|s| !s.trim().is_empty())
}
