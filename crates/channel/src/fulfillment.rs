//! Fulfillment operations, and the order reporting lookups shared with
//! payment capture.

use iqmetrix_dropship_core::{DateRange, Envelope, Page, Query, QueryKind, format_gmt};
use serde_json::Value;
use tracing::instrument;

use crate::channel::{DropshipChannel, parse_query};
use crate::client::Service;
use crate::document::{Document, DocumentExt, id_string, into_document, is_integer};
use crate::error::ChannelError;

/// Reporting timestamp a date range filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReportField {
    Created,
    Updated,
}

impl ReportField {
    const fn name(self) -> &'static str {
        match self {
            Self::Created => "createdUtc",
            Self::Updated => "updatedUtc",
        }
    }
}

/// Inclusive window on a report field, expressed with the exclusive
/// `gt`/`lt` operators the reporting API supports.
pub(crate) fn window_filters(field: ReportField, range: &DateRange) -> [String; 2] {
    let (start, end) = range.widened_by_millisecond();
    [
        format!("{} gt {}", field.name(), format_gmt(start)),
        format!("{} lt {}", field.name(), format_gmt(end)),
    ]
}

/// One page of the order list report.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OrderReport {
    pub rows: Vec<Value>,
    pub total_records: usize,
}

impl OrderReport {
    /// Order ids of the report rows.
    pub(crate) fn order_ids(&self) -> Vec<String> {
        self.rows.iter().filter_map(|row| row.get("_id").and_then(id_string)).collect()
    }
}

impl DropshipChannel {
    /// Get completed orders at the configured location by order id, created
    /// or modified date range, each with its full order.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` if the query is invalid or the order report
    /// fails. Individual orders that cannot be read are skipped.
    #[instrument(skip(self, query_doc))]
    pub async fn get_fulfillments(&self, query_doc: &Value) -> Result<Envelope<Vec<Value>>, ChannelError> {
        let query = parse_query(query_doc)?;
        let mut filters = vec![
            format!("companyId eq {}", self.config().company_id),
            "statusName eq Completed".to_string(),
            format!("locationId eq {}", self.config().location_id),
        ];

        let (ids, total) = match &query.kind {
            QueryKind::RemoteIds(_) => remote_id_page(&query),
            QueryKind::CreatedDateRange(range) => {
                filters.extend(window_filters(ReportField::Created, range));
                let report = self.order_report(&filters, query.page).await?;
                (report.order_ids(), report.total_records)
            }
            QueryKind::ModifiedDateRange(range) => {
                filters.extend(window_filters(ReportField::Updated, range));
                let report = self.order_report(&filters, query.page).await?;
                (report.order_ids(), report.total_records)
            }
        };

        let orders = self.fan_out(ids, |id| async move { Ok(self.order_info(&id).await) }).await?;
        let fulfillments: Vec<Value> = orders.into_iter().flatten().map(Value::Object).collect();

        if fulfillments.is_empty() {
            tracing::info!("No fulfillments found.");
        } else {
            tracing::info!("Submitting {} fulfillments...", fulfillments.len());
        }
        Ok(Envelope::page(fulfillments, query.page.has_more(total)))
    }

    /// Order detail with its `orderFull`, or `None` when the detail cannot be read.
    async fn order_info(&self, order_id: &str) -> Option<Document> {
        let mut order = match self.order_details(order_id).await {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!("Failed to get order detail for order '{order_id}': {e}");
                return None;
            }
        };
        let (Some(_), Some(invoice_number)) = (order.id_field("id"), order.id_field("invoiceNumber")) else {
            tracing::warn!("Order detail response is not in expected format, expected id and invoiceNumber properties.");
            return None;
        };

        let order_full = self.order_full(&invoice_number).await;
        order.insert("orderFull".to_string(), order_full);
        Some(order)
    }

    /// The order whose printable id is the invoice number, or `null`.
    async fn order_full(&self, invoice_number: &str) -> Value {
        tracing::info!("Getting order full details for order '{invoice_number}'");
        let filter = format!("PrintableId eq '{invoice_number}'");
        let reply = match self
            .client()
            .get(Service::Order, &self.company_path("/OrderFull"), &[("$filter", filter)])
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Failed to get order full details for order '{invoice_number}': {e}");
                return Value::Null;
            }
        };

        match reply.body {
            Value::Array(mut orders) if orders.len() == 1 => orders.swap_remove(0),
            Value::Array(orders) if orders.is_empty() => {
                tracing::warn!("Order full details response did not contain any results.");
                Value::Null
            }
            _ => {
                tracing::warn!(
                    "Order full details response is not in expected format, expected an array with 1 or 0 objects."
                );
                Value::Null
            }
        }
    }

    /// Order detail from the reporting service.
    pub(crate) async fn order_details(&self, order_id: &str) -> Result<Document, ChannelError> {
        tracing::info!("Getting order detail for order '{order_id}'");
        let reply = self
            .client()
            .get(
                Service::OrderManagementReporting,
                &self.company_path(&format!("/OrderDetails({order_id})")),
                &[],
            )
            .await?;

        match reply.body {
            Value::Object(order) => Ok(order),
            _ => Err(ChannelError::UnexpectedResponse(
                "Order detail response is not in expected format, expected an object.".to_string(),
            )),
        }
    }

    /// One page of the order list report, oldest first.
    pub(crate) async fn order_report(&self, filters: &[String], page: Page) -> Result<OrderReport, ChannelError> {
        let filter = filters.join(" and ");
        tracing::info!("Getting order report with filter: '{filter}'");

        let query = [
            ("filter", filter),
            ("page", page.number.to_string()),
            ("pageSize", page.size.to_string()),
            ("sortBy", "createdUtc".to_string()),
            ("sortOrder", "asc".to_string()),
        ];
        let reply = self
            .client()
            .get(Service::OrderManagementReporting, "/v1/Reports/OrderList/report", &query)
            .await?;

        let body = into_document(reply.body);
        let total = body.get("totalRecords").filter(|v| is_integer(v)).and_then(record_count);
        let (Some(Value::Array(rows)), Some(total)) = (body.get("rows"), total) else {
            return Err(ChannelError::UnexpectedResponse(
                "Order report response is not in expected format, expected rows[] and totalRecords properties."
                    .to_string(),
            ));
        };

        tracing::info!("Order report response contains {} of {total} records.", rows.len());
        Ok(OrderReport {
            rows: rows.clone(),
            total_records: total,
        })
    }
}

/// The requested page of unique remote ids, and the number of unique ids.
pub(crate) fn remote_id_page(query: &Query) -> (Vec<String>, usize) {
    let ids = query.unique_remote_ids();
    let batch = query.page.slice(&ids).to_vec();
    (batch, ids.len())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // is_integer guarantees an integral value
fn record_count(value: &Value) -> Option<usize> {
    value.as_f64().filter(|n| *n >= 0.0).map(|n| n as usize)
}
