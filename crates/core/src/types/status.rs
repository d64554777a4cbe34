//! Hub status codes.
//!
//! The hub understands a fixed set of HTTP-like status codes. Vendor
//! responses are always folded into one of these before being returned.

use serde::{Deserialize, Serialize};

/// Status code reported to the hub for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum HubStatus {
    /// Results returned, nothing further to fetch.
    Ok,
    /// Record created.
    Created,
    /// Nothing found.
    NoContent,
    /// More pages available.
    PartialContent,
    /// Request or response could not be processed.
    BadRequest,
    /// Expired or invalid auth token.
    Unauthorized,
    /// Existing document not found.
    NotFound,
    /// Request was throttled by the vendor.
    TooManyRequests,
    /// Vendor or transport failure.
    InternalError,
}

impl HubStatus {
    /// Numeric status code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::NoContent => 204,
            Self::PartialContent => 206,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::TooManyRequests => 429,
            Self::InternalError => 500,
        }
    }

    /// Status for one page of query results.
    ///
    /// 206 when more pages remain, otherwise 200 if anything was found and 204
    /// if not.
    #[must_use]
    pub const fn for_page(has_more: bool, count: usize) -> Self {
        if has_more {
            Self::PartialContent
        } else if count > 0 {
            Self::Ok
        } else {
            Self::NoContent
        }
    }

    /// Whether the status represents success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.code() < 300
    }
}

impl std::fmt::Display for HubStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<HubStatus> for u16 {
    fn from(status: HubStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u16> for HubStatus {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(Self::Ok),
            201 => Ok(Self::Created),
            204 => Ok(Self::NoContent),
            206 => Ok(Self::PartialContent),
            400 => Ok(Self::BadRequest),
            401 => Ok(Self::Unauthorized),
            404 => Ok(Self::NotFound),
            429 => Ok(Self::TooManyRequests),
            500 => Ok(Self::InternalError),
            other => Err(format!("Unsupported hub status code: {other}")),
        }
    }
}
