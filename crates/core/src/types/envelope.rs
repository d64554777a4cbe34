//! Normalized response envelope returned to the hub.

use serde::{Deserialize, Serialize};

use super::status::HubStatus;

/// The result of one hub operation.
///
/// Successful operations carry a payload; failures carry the mapped status,
/// the vendor status (when one was received), and the error messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub status_code: HubStatus,
    pub payload: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_status_code: Option<u16>,
}

impl<T> Envelope<T> {
    /// Envelope with an explicit status.
    #[must_use]
    pub const fn new(status_code: HubStatus, payload: T) -> Self {
        Self {
            status_code,
            payload,
            errors: Vec::new(),
            endpoint_status_code: None,
        }
    }

    /// 200 envelope.
    #[must_use]
    pub const fn ok(payload: T) -> Self {
        Self::new(HubStatus::Ok, payload)
    }

    /// 201 envelope.
    #[must_use]
    pub const fn created(payload: T) -> Self {
        Self::new(HubStatus::Created, payload)
    }

    /// Record the status code of the last vendor response.
    #[must_use]
    pub fn with_endpoint_status(mut self, status: Option<u16>) -> Self {
        self.endpoint_status_code = status;
        self
    }

    /// Transform the payload, keeping status and diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            status_code: self.status_code,
            payload: f(self.payload),
            errors: self.errors,
            endpoint_status_code: self.endpoint_status_code,
        }
    }
}

impl<T: Default> Envelope<T> {
    /// 204 envelope with an empty payload.
    #[must_use]
    pub fn no_content() -> Self {
        Self::new(HubStatus::NoContent, T::default())
    }

    /// Failure envelope.
    #[must_use]
    pub fn failure(status_code: HubStatus, endpoint_status_code: Option<u16>, error: String) -> Self {
        Self {
            status_code,
            payload: T::default(),
            errors: vec![error],
            endpoint_status_code,
        }
    }
}

impl<T> Envelope<Vec<T>> {
    /// Envelope for one page of query results.
    #[must_use]
    pub fn page(payload: Vec<T>, has_more: bool) -> Self {
        Self::new(HubStatus::for_page(has_more, payload.len()), payload)
    }
}
