//! iQmetrix Dropship Core - Shared hub types library.
//!
//! This crate provides the types exchanged between the e-commerce hub and the
//! iQmetrix dropship channel:
//! - [`Query`] - Validated hub query documents (remote ids or a date range, plus paging)
//! - [`HubStatus`] - Status codes reported back to the hub
//! - [`Envelope`] - The response wrapper every operation returns
//! - [`Payload`] - Hub documents sent to insert and extract operations
//! - [`SubscriptionList`] - Catalog source lists paired with their supplier
//! - [`extract_business_reference`] - Builds a reference from paths into a document
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Query documents, hub status codes, envelopes, payloads,
//!   subscription lists, and business-reference extraction

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
