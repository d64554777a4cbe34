//! Error taxonomy for channel operations.
//!
//! Every failure, whatever its origin, is folded into one of the hub status
//! codes by [`ChannelError::hub_status`] before it reaches the hub.

use iqmetrix_dropship_core::{Envelope, HubStatus, QueryError};
use serde_json::Value;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Transport failure (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Vendor answered with a non-success status.
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Vendor response did not have the expected shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Query document failed validation.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Channel profile failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Hub payload is missing something the operation needs.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Catalog lookup by vendor SKU did not resolve to exactly one item.
    #[error("{0}")]
    Lookup(String),

    /// A sales order step after the dropship order was created failed.
    ///
    /// `created` holds the vendor responses received before the failure.
    #[error("{step} failed: {source}")]
    OrderStep {
        step: &'static str,
        created: Value,
        #[source]
        source: Box<Self>,
    },
}

impl ChannelError {
    /// Hub status for this error.
    #[must_use]
    pub fn hub_status(&self) -> HubStatus {
        match self {
            Self::Status { status, .. } => match *status {
                s if s >= 500 => HubStatus::InternalError,
                429 => HubStatus::TooManyRequests,
                404 => HubStatus::NotFound,
                401 => HubStatus::Unauthorized,
                _ => HubStatus::BadRequest,
            },
            Self::Http(_) => HubStatus::InternalError,
            Self::UnexpectedResponse(_)
            | Self::Query(_)
            | Self::Config(_)
            | Self::InvalidPayload(_)
            | Self::Lookup(_)
            | Self::OrderStep { .. } => HubStatus::BadRequest,
        }
    }

    /// Status code of the vendor response that caused this error, if any.
    ///
    /// Failed sales order steps always report 400.
    #[must_use]
    pub fn endpoint_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::OrderStep { .. } => Some(HubStatus::BadRequest.code()),
            _ => None,
        }
    }

    /// Whether the vendor reported the record as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    /// Wrap this error as a failed sales order step.
    #[must_use]
    pub fn in_step(self, step: &'static str, created: Value) -> Self {
        Self::OrderStep {
            step,
            created,
            source: Box::new(self),
        }
    }

    /// Log the error and render the failure envelope.
    ///
    /// A failed sales order step keeps the documents it already created as
    /// the payload; every other failure has a `null` payload.
    #[must_use]
    pub fn into_envelope(self) -> Envelope<Value> {
        let status = self.hub_status();
        let endpoint_status = self.endpoint_status();

        match status {
            HubStatus::TooManyRequests => tracing::warn!("Request was throttled."),
            HubStatus::NotFound => tracing::warn!("Existing document not found."),
            HubStatus::Unauthorized => tracing::warn!("Expired/Invalid auth token."),
            _ => {}
        }
        tracing::error!(
            error = %self,
            status = status.code(),
            endpoint_status = ?endpoint_status,
            "Operation failed"
        );

        let message = self.to_string();
        let payload = match self {
            Self::OrderStep { created, .. } => created,
            _ => Value::Null,
        };
        Envelope {
            payload,
            ..Envelope::failure(status, endpoint_status, message)
        }
    }
}
