//! Query documents sent by the hub for "get X from query" operations.
//!
//! A query document names exactly one search mode: a list of remote IDs, a
//! created-date range, or a modified-date range. Validation turns the wire
//! shape into a [`Query`] so handlers never see an ambiguous request.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PAGE_SIZE: u32 = 25;

/// Errors raised while validating a query document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// One or more validation rules failed.
    #[error("QueryDoc validation failed: {}", format_errors(.0))]
    Invalid(Vec<String>),
}

fn format_errors(errors: &[String]) -> String {
    serde_json::to_string(errors).unwrap_or_else(|_| errors.join("; "))
}

/// A date range as sent by the hub (unparsed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDateRange {
    #[serde(rename = "startDateGMT", default, skip_serializing_if = "Option::is_none")]
    pub start_date_gmt: Option<String>,
    #[serde(rename = "endDateGMT", default, skip_serializing_if = "Option::is_none")]
    pub end_date_gmt: Option<String>,
}

/// Query document as received from the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDoc {
    #[serde(rename = "remoteIDs", default, skip_serializing_if = "Option::is_none")]
    pub remote_ids: Option<Vec<String>>,
    #[serde(rename = "createdDateRange", default, skip_serializing_if = "Option::is_none")]
    pub created_date_range: Option<RawDateRange>,
    #[serde(rename = "modifiedDateRange", default, skip_serializing_if = "Option::is_none")]
    pub modified_date_range: Option<RawDateRange>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: u32,
}

const fn default_page() -> u32 {
    DEFAULT_PAGE
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for QueryDoc {
    fn default() -> Self {
        Self {
            remote_ids: None,
            created_date_range: None,
            modified_date_range: None,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A validated, parsed date range in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Bounds widened by one millisecond on each side.
    ///
    /// The reporting API only has exclusive `gt`/`lt` operators; widening the
    /// bounds makes the range inclusive.
    #[must_use]
    pub fn widened_by_millisecond(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let ms = TimeDelta::milliseconds(1);
        (self.start - ms, self.end + ms)
    }
}

/// Which search the hub asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    RemoteIds(Vec<String>),
    CreatedDateRange(DateRange),
    ModifiedDateRange(DateRange),
}

impl QueryKind {
    /// Hub name of the query type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RemoteIds(_) => "remoteIDs",
            Self::CreatedDateRange(_) => "createdDateRange",
            Self::ModifiedDateRange(_) => "modifiedDateRange",
        }
    }
}

/// One-based page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    /// Index of the first record on this page.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.number.saturating_sub(1) as usize * self.size as usize
    }

    /// Index one past the last record on this page.
    #[must_use]
    pub fn end(&self) -> usize {
        self.number as usize * self.size as usize
    }

    /// The records of `items` that fall on this page.
    #[must_use]
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset().min(items.len());
        let end = self.end().min(items.len());
        items.get(start..end).unwrap_or_default()
    }

    /// Whether the hub should ask for another page, given the total number of
    /// matching records.
    #[must_use]
    pub fn has_more(&self, total: usize) -> bool {
        u64::from(self.number) * u64::from(self.size) <= total as u64
    }
}

/// A validated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub kind: QueryKind,
    pub page: Page,
}

impl Query {
    /// Remote IDs de-duplicated in first-seen order, blanks dropped.
    ///
    /// Empty for date range queries.
    #[must_use]
    pub fn unique_remote_ids(&self) -> Vec<String> {
        match &self.kind {
            QueryKind::RemoteIds(ids) => {
                let mut unique: Vec<String> = Vec::with_capacity(ids.len());
                for id in ids {
                    if !id.trim().is_empty() && !unique.contains(id) {
                        unique.push(id.clone());
                    }
                }
                unique
            }
            QueryKind::CreatedDateRange(_) | QueryKind::ModifiedDateRange(_) => Vec::new(),
        }
    }
}

impl QueryDoc {
    /// Validate the document and determine the query type.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Invalid` with every failed rule.
    pub fn validate(&self) -> Result<Query, QueryError> {
        let mut errors = Vec::new();

        let kind = match (
            &self.remote_ids,
            &self.modified_date_range,
            &self.created_date_range,
        ) {
            (Some(ids), None, None) => {
                if ids.is_empty() {
                    errors.push("The remoteIDs property must be an array with at least 1 value.".to_string());
                }
                Some(QueryKind::RemoteIds(ids.clone()))
            }
            (None, Some(range), None) => {
                parse_range(range, "modifiedDateRange", &mut errors).map(QueryKind::ModifiedDateRange)
            }
            (None, None, Some(range)) => {
                parse_range(range, "createdDateRange", &mut errors).map(QueryKind::CreatedDateRange)
            }
            _ => {
                errors.push(
                    "QueryDoc must contain one (and only one) of remoteIDs, modifiedDateRange, or createdDateRange."
                        .to_string(),
                );
                None
            }
        };

        if self.page == 0 {
            errors.push("page must be at least 1.".to_string());
        }
        if self.page_size == 0 {
            errors.push("pageSize must be at least 1.".to_string());
        }

        match kind {
            Some(kind) if errors.is_empty() => Ok(Query {
                kind,
                page: Page {
                    number: self.page,
                    size: self.page_size,
                },
            }),
            _ => Err(QueryError::Invalid(errors)),
        }
    }
}

fn parse_range(range: &RawDateRange, name: &str, errors: &mut Vec<String>) -> Option<DateRange> {
    let start = range.start_date_gmt.as_deref().and_then(parse_gmt);
    let end = range.end_date_gmt.as_deref().and_then(parse_gmt);

    let (Some(start), Some(end)) = (start, end) else {
        errors.push(format!(
            "{name} query requires valid startDateGMT and endDateGMT properties."
        ));
        return None;
    };

    if start >= end {
        errors.push("startDateGMT must come before endDateGMT.".to_string());
        return None;
    }

    Some(DateRange { start, end })
}

/// Parse a GMT timestamp.
///
/// Accepts RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.fff]` / `YYYY-MM-DD`
/// value interpreted as UTC.
#[must_use]
pub fn parse_gmt(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Format a timestamp the way the iQmetrix filters expect
/// (`2024-01-31T08:00:00.000Z`).
#[must_use]
pub fn format_gmt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
