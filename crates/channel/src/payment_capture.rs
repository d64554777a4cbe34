//! Payment capture operations.
//!
//! A payment capture is an order detail from the reporting service, tagged
//! with the business references the hub matches it by. Each capture carries
//! its own status, so one unreadable order does not fail the page.

use iqmetrix_dropship_core::{Envelope, HubStatus, QueryKind, extract_business_reference};
use serde_json::{Value, json};
use tracing::instrument;

use crate::channel::{DropshipChannel, parse_query};
use crate::config::BusinessReferences;
use crate::error::ChannelError;
use crate::fulfillment::{ReportField, remote_id_page, window_filters};

/// The capture entry for an order detail.
fn capture(order: Value, references: &BusinessReferences) -> Value {
    let sales_order_remote_id = order
        .pointer("/dropshipOrderItems/0/dropshipOrderId")
        .cloned()
        .unwrap_or(Value::Null);
    json!({
        "statusCode": HubStatus::Ok,
        "paymentCaptureRemoteID": order.get("id").cloned().unwrap_or(Value::Null),
        "paymentCaptureBusinessReference": extract_business_reference(&references.payment_capture, &order),
        "salesOrderRemoteID": sales_order_remote_id,
        "salesOrderBusinessReference": extract_business_reference(&references.sales_order, &order),
        "doc": order,
    })
}

/// The capture entry for an order detail that could not be read.
fn failed_capture(order_id: &str, error: &ChannelError) -> Value {
    tracing::warn!("Failed to get payment capture for order '{order_id}': {error}");
    let mut entry = json!({
        "statusCode": error.hub_status(),
        "paymentCaptureRemoteID": order_id,
        "error": error.to_string(),
    });
    if let Some(status) = error.endpoint_status() {
        entry["endpointStatusCode"] = json!(status);
    }
    entry
}

impl DropshipChannel {
    /// Get payment captures by order id, created or modified date range.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` if the business references are not configured,
    /// the query is invalid or the order report fails.
    #[instrument(skip(self, query_doc))]
    pub async fn get_payment_captures(&self, query_doc: &Value) -> Result<Envelope<Vec<Value>>, ChannelError> {
        let references = self.config().require_business_references()?;
        let query = parse_query(query_doc)?;
        let company_filter = format!("companyId eq {}", self.config().company_id);

        let (ids, total) = match &query.kind {
            QueryKind::RemoteIds(_) => remote_id_page(&query),
            QueryKind::CreatedDateRange(range) | QueryKind::ModifiedDateRange(range) => {
                let field = if matches!(query.kind, QueryKind::CreatedDateRange(_)) {
                    ReportField::Created
                } else {
                    ReportField::Updated
                };
                let mut filters = vec![company_filter];
                filters.extend(window_filters(field, range));
                let report = self.order_report(&filters, query.page).await?;
                (report.order_ids(), report.total_records)
            }
        };

        let captures = self
            .fan_out(ids, |id| async move {
                Ok(match self.order_details(&id).await {
                    Ok(order) => capture(Value::Object(order), references),
                    Err(e) => failed_capture(&id, &e),
                })
            })
            .await?;

        if captures.is_empty() {
            tracing::info!("No payment captures found.");
        } else {
            tracing::info!("Submitting {} payment captures...", captures.len());
        }
        Ok(Envelope::page(captures, query.page.has_more(total)))
    }
}
