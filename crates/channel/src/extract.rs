//! Extraction of nested records from hub documents.
//!
//! These operations never call the vendor: they pull a customer, address or
//! contact out of a sales order or customer document and stamp the owning
//! customer id so the hub can route the record to the matching insert.

use iqmetrix_dropship_core::payload::non_blank;
use iqmetrix_dropship_core::{Envelope, HubStatus, Payload};
use serde_json::Value;

use crate::document::{Document, DocumentExt, id_string};

/// Billing address of a sales order.
#[must_use]
pub fn billing_address_from_sales_order(payload: &Payload) -> Envelope<Value> {
    tracing::info!("Extracting billing address from order...");
    order_address(
        payload,
        "BillingAddress",
        non_blank(payload.billing_customer_remote_id.as_ref()),
        "No billing address found on the order.",
    )
}

/// Shipping address of a sales order.
#[must_use]
pub fn shipping_address_from_sales_order(payload: &Payload) -> Envelope<Value> {
    tracing::info!("Extracting shipping address from order...");
    order_address(
        payload,
        "ShippingAddress",
        non_blank(payload.shipping_customer_remote_id.as_ref()),
        "No shipping address found on the order.",
    )
}

/// Customer of a sales order.
#[must_use]
pub fn customer_from_sales_order(payload: &Payload) -> Envelope<Value> {
    tracing::info!("Extracting customer from order...");
    match payload.doc.object_field("Customer").filter(|c| !c.is_empty()) {
        Some(customer) => Envelope::ok(Value::Object(customer.clone())),
        None => {
            tracing::warn!("No customer found on the order.");
            Envelope::new(HubStatus::NoContent, Value::Object(Document::new()))
        }
    }
}

/// Addresses of a customer, each stamped with the customer id.
#[must_use]
pub fn customer_addresses_from_customer(payload: &Payload) -> Envelope<Value> {
    tracing::info!("Extracting customer addresses from customer...");
    customer_children(payload, "Addresses", "No customer addresses found on the customer.")
}

/// Contact methods of a customer, each stamped with the customer id.
#[must_use]
pub fn customer_contacts_from_customer(payload: &Payload) -> Envelope<Value> {
    tracing::info!("Extracting customer contacts from customer...");
    customer_children(payload, "ContactMethods", "No customer contacts found on the customer.")
}

fn order_address(payload: &Payload, key: &str, side_customer: Option<&str>, missing: &str) -> Envelope<Value> {
    let Some(address) = payload.doc.object_field(key).filter(|a| !a.is_empty()) else {
        tracing::warn!("{missing}");
        return Envelope::new(HubStatus::NoContent, Value::Object(Document::new()));
    };

    let mut address = address.clone();
    let customer_id = side_customer
        .or_else(|| non_blank(payload.customer_remote_id.as_ref()))
        .map(|id| Value::String(id.to_string()));
    stamp_customer(&mut address, customer_id.as_ref());
    Envelope::ok(Value::Object(address))
}

fn customer_children(payload: &Payload, key: &str, missing: &str) -> Envelope<Value> {
    let children = payload.doc.array_field(key);
    if children.is_empty() {
        tracing::warn!("{missing}");
        return Envelope::new(HubStatus::NoContent, Value::Array(Vec::new()));
    }

    let customer_id = payload
        .doc
        .get("Id")
        .filter(|id| id_string(id).is_some())
        .cloned()
        .or_else(|| non_blank(payload.customer_remote_id.as_ref()).map(|id| Value::String(id.to_string())));

    let stamped = children
        .iter()
        .map(|child| match child {
            Value::Object(doc) => {
                let mut doc = doc.clone();
                stamp_customer(&mut doc, customer_id.as_ref());
                Value::Object(doc)
            }
            other => other.clone(),
        })
        .collect();
    Envelope::ok(Value::Array(stamped))
}

/// Set `CustomerId` unless the record already carries one.
fn stamp_customer(doc: &mut Document, customer_id: Option<&Value>) {
    if doc.id_field("CustomerId").is_none()
        && let Some(id) = customer_id
    {
        doc.insert("CustomerId".to_string(), id.clone());
    }
}
