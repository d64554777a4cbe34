//! Product quantity (supplier availability) operations.

use iqmetrix_dropship_core::{DateRange, Envelope, Query, QueryKind, SubscriptionList, format_gmt};
use serde_json::{Value, json};
use tracing::instrument;

use crate::channel::{DropshipChannel, parse_query};
use crate::client::Service;
use crate::document::{Document, DocumentExt, id_string, into_document};
use crate::error::ChannelError;

impl DropshipChannel {
    /// Get supplier availabilities by supplier SKU, created or modified date range.
    ///
    /// Every availability is enriched with the catalog items carrying its SKU
    /// on the subscription list; availabilities with none are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` if the query is invalid or a vendor call fails.
    #[instrument(skip(self, query_doc))]
    pub async fn get_product_quantity(&self, query_doc: &Value) -> Result<Envelope<Vec<Value>>, ChannelError> {
        let query = parse_query(query_doc)?;

        let (quantities, has_more) = match &query.kind {
            QueryKind::RemoteIds(_) => self.quantities_by_sku(&query).await?,
            QueryKind::CreatedDateRange(range) => {
                tracing::warn!(
                    "Searching by createdDateRange is not supported, will search on modifiedDateRange instead."
                );
                (self.quantities_modified_between(range).await?, false)
            }
            QueryKind::ModifiedDateRange(range) => (self.quantities_modified_between(range).await?, false),
        };

        if quantities.is_empty() {
            tracing::info!("No products found.");
        } else {
            tracing::info!("Submitting {} updated product quantities...", quantities.len());
        }
        Ok(Envelope::page(quantities, has_more))
    }

    async fn quantities_by_sku(&self, query: &Query) -> Result<(Vec<Value>, bool), ChannelError> {
        let skus = query.unique_remote_ids();
        let batch = query.page.slice(&skus);

        let per_list = self
            .fan_out(&self.config().subscription_lists, |list| async move {
                let availabilities = self.bulk_supplier_availability(list, batch).await?;
                self.availability_details(availabilities, list).await
            })
            .await?;

        let quantities = per_list.into_iter().flatten().map(Value::Object).collect();
        Ok((quantities, query.page.has_more(skus.len())))
    }

    async fn quantities_modified_between(&self, range: &DateRange) -> Result<Vec<Value>, ChannelError> {
        let per_list = self
            .fan_out(&self.config().subscription_lists, |list| async move {
                let availabilities = self.supplier_skus_modified_between(list, range).await?;
                self.availability_details(availabilities, list).await
            })
            .await?;

        Ok(per_list.into_iter().flatten().map(Value::Object).collect())
    }

    async fn bulk_supplier_availability(
        &self,
        list: &SubscriptionList,
        skus: &[String],
    ) -> Result<Vec<Value>, ChannelError> {
        tracing::info!("Getting BulkSupplierAvailability for supplier {}", list.supplier_id);
        let body = json!({
            "SupplierAvailabilities": skus.iter().map(|sku| json!({"SupplierSku": sku})).collect::<Vec<_>>()
        });
        let path = format!(
            "/v1/Suppliers({})/Companies({})/BulkSupplierAvailability",
            list.supplier_id,
            self.config().company_id
        );
        let reply = self.client().post(Service::Availability, &path, &body).await?;

        match reply.body.get("SupplierAvailabilities") {
            Some(Value::Array(availabilities)) => Ok(availabilities.clone()),
            _ => Err(ChannelError::UnexpectedResponse(
                "Response is not in expected format, expected SupplierAvailabilities array.".to_string(),
            )),
        }
    }

    async fn supplier_skus_modified_between(
        &self,
        list: &SubscriptionList,
        range: &DateRange,
    ) -> Result<Vec<Value>, ChannelError> {
        tracing::info!("Getting availability for supplier {}", list.supplier_id);
        let filter = format!(
            "LastModifiedDateUtc ge datetime'{}' and LastModifiedDateUtc le datetime'{}'",
            format_gmt(range.start),
            format_gmt(range.end)
        );
        let path = format!(
            "/v1/Suppliers({})/Companies({})/SupplierSkus",
            list.supplier_id,
            self.config().company_id
        );
        let reply = self
            .client()
            .get(Service::Availability, &path, &[("$filter", filter)])
            .await?;

        match reply.body {
            Value::Array(availabilities) => Ok(availabilities),
            _ => Err(ChannelError::UnexpectedResponse(
                "Response is not in expected format, expected an array of availability objects.".to_string(),
            )),
        }
    }

    /// Merge each availability with its list-scoped vendor SKU details and
    /// keep those with catalog items.
    async fn availability_details(
        &self,
        availabilities: Vec<Value>,
        list: &SubscriptionList,
    ) -> Result<Vec<Document>, ChannelError> {
        let total = availabilities.len();
        tracing::info!("SupplierAvailabilities count: {total}");

        let enriched = self
            .fan_out(availabilities, |availability| async move {
                let mut availability = into_document(availability);
                let mut details = match availability.str_field("SupplierSku") {
                    Some(sku) => {
                        let vendor_id = availability
                            .get("SupplierEntityId")
                            .and_then(id_string)
                            .unwrap_or_else(|| list.supplier_id.to_string());
                        self.details_by_vendor_sku(sku, &vendor_id).await?
                    }
                    None => {
                        let id = availability.get("Id").cloned().unwrap_or_default();
                        tracing::info!("AvailabilityItem with Id {id} has no SupplierSku. Skipping.");
                        into_document(json!({"Items": []}))
                    }
                };

                if let Some(Value::Array(items)) = details.get_mut("Items") {
                    items.retain(|item| list.sources(item.get("SourceIds")));
                }
                availability.merge(&details);
                Ok(availability)
            })
            .await?;

        let (available, skipped): (Vec<Document>, Vec<Document>) = enriched
            .into_iter()
            .partition(|availability| !availability.array_field("Items").is_empty());
        tracing::info!("SupplierSku count: {}", available.len());
        tracing::info!("SupplierSkus with an empty Items array: {}", skipped.len());
        Ok(available)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::tests::profile;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn channel(server: &MockServer) -> DropshipChannel {
        let mut profile = profile();
        profile["channelSettingsValues"]["baseUrlTemplate"] = json!(format!("{}/{{service}}", server.uri()));
        profile["channelSettingsValues"]["subscriptionLists"] = json!([{"listId": "list-a", "supplierId": 7187}]);
        DropshipChannel::from_profile(&profile).unwrap()
    }

    #[tokio::test]
    async fn test_remote_ids_enriched_and_filtered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/availability/v1/Suppliers(7187)/Companies(13149)/BulkSupplierAvailability"))
            .and(body_json(json!({"SupplierAvailabilities": [{"SupplierSku": "SKU-1"}, {"SupplierSku": "SKU-2"}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "SupplierAvailabilities": [
                    {"SupplierSku": "SKU-1", "SupplierEntityId": 7187, "Quantity": 4},
                    {"SupplierSku": "SKU-2", "SupplierEntityId": 7187, "Quantity": 0}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/catalogs/v1/Companies(13149)/Catalog/Items/ByVendorSku"))
            .and(query_param("vendorSku", "SKU-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [
                    {"CatalogItemId": "c-1", "SourceIds": ["list-a"]},
                    {"CatalogItemId": "c-2", "SourceIds": ["list-b"]}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/catalogs/v1/Companies(13149)/Catalog/Items/ByVendorSku"))
            .and(query_param("vendorSku", "SKU-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Items": [{"SourceIds": ["list-b"]}]})))
            .mount(&server)
            .await;

        let channel = channel(&server).await;
        let envelope = channel
            .get_product_quantity(&json!({"remoteIDs": ["SKU-1", "SKU-2", "SKU-1"]}))
            .await
            .unwrap();

        assert_eq!(envelope.status_code.code(), 200);
        assert_eq!(envelope.payload.len(), 1);
        assert_eq!(envelope.payload[0]["Quantity"], json!(4));
        assert_eq!(envelope.payload[0]["Items"], json!([{"CatalogItemId": "c-1", "SourceIds": ["list-a"]}]));
    }

    #[tokio::test]
    async fn test_date_range_never_reports_more() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/availability/v1/Suppliers(7187)/Companies(13149)/SupplierSkus"))
            .and(query_param(
                "$filter",
                "LastModifiedDateUtc ge datetime'2024-01-01T00:00:00.000Z' and LastModifiedDateUtc le datetime'2024-01-02T00:00:00.000Z'",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"Id": 9}])))
            .mount(&server)
            .await;

        let channel = channel(&server).await;
        let envelope = channel
            .get_product_quantity(&json!({
                "createdDateRange": {"startDateGMT": "2024-01-01T00:00:00Z", "endDateGMT": "2024-01-02T00:00:00Z"},
                "pageSize": 1
            }))
            .await
            .unwrap();

        assert_eq!(envelope.status_code.code(), 204);
        assert!(envelope.payload.is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_availability_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let channel = channel(&server).await;
        let err = channel
            .get_product_quantity(&json!({"remoteIDs": ["SKU-1"]}))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::UnexpectedResponse(_)));
    }
}
