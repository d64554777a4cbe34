//! Core types for the dropship channel.
//!
//! This module provides type-safe wrappers for the hub calling convention.

pub mod business_reference;
pub mod envelope;
pub mod id;
pub mod payload;
pub mod query;
pub mod status;
pub mod subscription;

pub use business_reference::extract_business_reference;
pub use envelope::Envelope;
pub use id::*;
pub use payload::Payload;
pub use query::{DateRange, Page, Query, QueryDoc, QueryError, QueryKind, RawDateRange, format_gmt};
pub use status::HubStatus;
pub use subscription::SubscriptionList;
