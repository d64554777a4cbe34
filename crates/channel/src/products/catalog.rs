//! Catalog lookups shared by the simple and matrix product pipelines.

use iqmetrix_dropship_core::{DateRange, Page, SubscriptionList, SupplierId, format_gmt};
use serde_json::{Value, json};
use tracing::instrument;
use uuid::Uuid;

use super::ProductShape;
use crate::channel::DropshipChannel;
use crate::client::Service;
use crate::document::{Document, DocumentExt, into_document, is_non_empty_array};
use crate::error::ChannelError;

/// Catalog item ids per bulk details request.
const CATALOG_DETAILS_CHUNK: usize = 500;

/// Slugs per bulk product library request.
const SLUG_DETAILS_CHUNK: usize = 100;

/// The document's catalog item id, unless blank or the nil GUID.
pub(crate) fn catalog_item_id(doc: &Document) -> Option<&str> {
    doc.str_field("CatalogItemId")
        .filter(|id| !matches!(Uuid::parse_str(id), Ok(uuid) if uuid.is_nil()))
}

/// The `VendorSKU` identifier for the list's supplier.
pub(crate) fn vendor_sku_identifier(doc: &Document, list: &SubscriptionList) -> Option<Value> {
    doc.array_field("Identifiers")
        .iter()
        .find(|identifier| {
            identifier.get("SkuType").and_then(Value::as_str) == Some("VendorSKU")
                && identifier
                    .get("Entity")
                    .and_then(|entity| entity.get("Id"))
                    .is_some_and(|id| list.supplier_id.matches_json(id))
        })
        .cloned()
}

/// The product library vendor SKU entry for the list's supplier.
pub(crate) fn vendor_sku_entry(doc: &Document, list: &SubscriptionList) -> Option<Value> {
    doc.array_field("VendorSkus")
        .iter()
        .find(|sku| {
            sku.get("Entity")
                .and_then(|entity| entity.get("Id"))
                .is_some_and(|id| list.supplier_id.matches_json(id))
        })
        .cloned()
}

/// Whether a grouped search record is list-sourced and supplied by one of
/// the subscription vendors.
pub(crate) fn is_subscribed(doc: &Document, supplier_ids: &[SupplierId]) -> bool {
    let list_sourced = doc.get("IsListSourced").and_then(Value::as_bool).unwrap_or(true);
    list_sourced
        && doc.array_field("Vendors").iter().any(|vendor| {
            vendor
                .get("Id")
                .is_some_and(|id| supplier_ids.iter().any(|supplier| supplier.matches_json(id)))
        })
}

/// Stamp the subscription list and vendor SKU onto a product.
pub(crate) fn annotate(doc: &mut Document, list: &SubscriptionList, vendor_sku: Option<Value>) {
    doc.insert("ncSubscriptionList".to_string(), list.to_value());
    if let Some(vendor_sku) = vendor_sku {
        doc.insert("ncVendorSku".to_string(), vendor_sku);
    }
}

/// Collect unique values in first-seen order.
pub(crate) fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// The `Sku` of an annotated vendor SKU identifier.
fn annotated_sku(doc: &Document) -> Option<String> {
    doc.get("ncVendorSku")
        .and_then(|sku| sku.get("Sku"))
        .and_then(Value::as_str)
        .filter(|sku| !sku.trim().is_empty())
        .map(ToString::to_string)
}

impl DropshipChannel {
    /// Item structure (parent with its variations) by catalog item id.
    ///
    /// A missing catalog item is logged and skipped.
    #[instrument(skip(self))]
    pub(crate) async fn item_structure(&self, catalog_item_id: &String) -> Result<Option<Document>, ChannelError> {
        tracing::info!("Getting item structure by catalog id '{catalog_item_id}'");
        let path = self.company_path(&format!("/Catalog/Items({catalog_item_id})/Structure"));

        let reply = match self.client().get(Service::Catalogs, &path, &[]).await {
            Ok(reply) => reply,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Catalog Item for catalogItemId '{catalog_item_id}' does not exist.");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let structure = into_document(reply.body);
        if structure.str_field("Slug").is_none() {
            return Err(ChannelError::UnexpectedResponse(
                "Item structure response is not in expected format, expected Slug property.".to_string(),
            ));
        }
        Ok(Some(structure))
    }

    /// Catalog lookup by vendor SKU.
    ///
    /// Returns the response document, which always carries an `Items` array.
    #[instrument(skip(self))]
    pub(crate) async fn details_by_vendor_sku(
        &self,
        vendor_sku: &str,
        vendor_id: &str,
    ) -> Result<Document, ChannelError> {
        tracing::info!("Getting catalog item details by vendor '{vendor_id}' and sku '{vendor_sku}'");
        let query = [("vendorId", vendor_id.to_string()), ("vendorSku", vendor_sku.to_string())];
        let reply = self
            .client()
            .get(Service::Catalogs, &self.company_path("/Catalog/Items/ByVendorSku"), &query)
            .await?;

        let details = into_document(reply.body);
        if !details.get("Items").is_some_and(Value::is_array) {
            return Err(ChannelError::UnexpectedResponse(
                "Response is not in expected format, expected Items[] property.".to_string(),
            ));
        }
        if details.array_field("Items").is_empty() {
            tracing::info!("Vendor '{vendor_id}' and SKU '{vendor_sku}' returned 0 Items.");
        }
        Ok(details)
    }

    /// The list-sourced catalog entry for a product's vendor SKU.
    ///
    /// Matches on catalog item id when the product has one, otherwise on slug.
    pub(crate) async fn vendor_sku_detail(
        &self,
        product: &Document,
        vendor_sku: &str,
        list: &SubscriptionList,
    ) -> Result<Option<Document>, ChannelError> {
        let details = self
            .details_by_vendor_sku(vendor_sku, &list.supplier_id.to_string())
            .await?;
        let catalog_id = catalog_item_id(product);
        let slug = product.str_field("Slug");

        Ok(details.array_field("Items").iter().cloned().map(into_document).find(|item| {
            if !list.sources(item.get("SourceIds")) {
                return false;
            }
            let same_catalog_item =
                catalog_id.is_some_and(|id| item.get("CatalogItemId").and_then(Value::as_str) == Some(id));
            let same_slug = slug.is_some_and(|s| item.get("Slug").and_then(Value::as_str) == Some(s));
            same_catalog_item || same_slug
        }))
    }

    /// Merge the parent's vendor SKU detail when its annotated SKU resolves.
    pub(crate) async fn merge_vendor_sku_detail(
        &self,
        item: &mut Document,
        list: &SubscriptionList,
    ) -> Result<(), ChannelError> {
        if let Some(sku) = annotated_sku(item)
            && let Some(detail) = self.vendor_sku_detail(item, &sku, list).await?
        {
            item.merge(&detail);
        }
        Ok(())
    }

    /// Keep the variants whose vendor SKU resolves to an entry on the list,
    /// annotated and merged with that entry.
    pub(crate) async fn filter_variants(
        &self,
        products: Vec<Value>,
        list: &SubscriptionList,
    ) -> Result<Vec<Value>, ChannelError> {
        let filtered = self
            .fan_out(products, |product| async move {
                let mut product = into_document(product);
                let vendor_sku = vendor_sku_identifier(&product, list);
                annotate(&mut product, list, vendor_sku);

                let Some(sku) = annotated_sku(&product) else {
                    return Ok(None);
                };
                Ok(self.vendor_sku_detail(&product, &sku, list).await?.map(|detail| {
                    product.merge(&detail);
                    Value::Object(product)
                }))
            })
            .await?;
        Ok(filtered.into_iter().flatten().collect())
    }

    /// Bulk catalog item details keyed by catalog item id.
    pub(crate) async fn catalog_item_details(&self, catalog_item_ids: &[String]) -> Result<Document, ChannelError> {
        if catalog_item_ids.is_empty() {
            tracing::info!("No products to get catalog item details for.");
            return Ok(Document::new());
        }

        tracing::info!(
            "Getting bulk catalog item details by CatalogItemIds for {} total items.",
            catalog_item_ids.len()
        );
        let path = self.company_path("/Catalog/Items/ProductDetails/Bulk");
        let chunks = self
            .fan_out(catalog_item_ids.chunks(CATALOG_DETAILS_CHUNK), |chunk| {
                let path = &path;
                async move {
                    tracing::info!("Requesting {} catalog item details.", chunk.len());
                    let reply = self
                        .client()
                        .post(Service::Catalogs, path, &json!({ "CatalogItemIds": chunk }))
                        .await?;
                    match reply.body.get("CatalogItems") {
                        Some(Value::Object(items)) => Ok(items.clone()),
                        _ => Err(ChannelError::UnexpectedResponse(
                            "Response is not in expected format, expected CatalogItems property.".to_string(),
                        )),
                    }
                }
            })
            .await?;

        let mut details = Document::new();
        for chunk in &chunks {
            details.merge(chunk);
        }
        Ok(details)
    }

    /// Bulk product library details keyed by slug.
    pub(crate) async fn slug_details(&self, slugs: &[String]) -> Result<Document, ChannelError> {
        if slugs.is_empty() {
            tracing::info!("No products to get slug details for.");
            return Ok(Document::new());
        }

        tracing::info!("Getting bulk product details by Slug for {} total items.", slugs.len());
        let chunks = self
            .fan_out(slugs.chunks(SLUG_DETAILS_CHUNK), |chunk| async move {
                tracing::info!("Requesting {} slug details.", chunk.len());
                let reply = self
                    .client()
                    .get(Service::ProductLibrary, "/v1/Products/GetBulk", &[("Slugs", chunk.join(","))])
                    .await?;
                match reply.body.get("Products") {
                    Some(Value::Object(products)) => Ok(products.clone()),
                    _ => Err(ChannelError::UnexpectedResponse(
                        "Response is not in expected format, expected Products property.".to_string(),
                    )),
                }
            })
            .await?;

        let mut details = Document::new();
        for chunk in &chunks {
            details.merge(chunk);
        }
        Ok(details)
    }

    /// Merge bulk details onto items and their variants.
    ///
    /// Records with a catalog item id are hydrated from the catalog, the rest
    /// from the product library by slug.
    pub(crate) async fn hydrate(&self, items: &mut [Document]) -> Result<(), ChannelError> {
        let mut catalog_ids = Vec::new();
        let mut slugs = Vec::new();
        for item in items.iter() {
            collect_detail_key(item, &mut catalog_ids, &mut slugs);
            for product in item.array_field("Products") {
                if let Some(product) = product.as_object() {
                    collect_detail_key(product, &mut catalog_ids, &mut slugs);
                }
            }
        }

        let catalog_details = self.catalog_item_details(&catalog_ids).await?;
        let slug_details = self.slug_details(&slugs).await?;

        for item in items.iter_mut() {
            merge_detail(item, &catalog_details, &slug_details);
            if let Some(Value::Array(products)) = item.get_mut("Products") {
                for product in products.iter_mut() {
                    if let Some(product) = product.as_object_mut() {
                        merge_detail(product, &catalog_details, &slug_details);
                    }
                }
            }
        }
        Ok(())
    }

    /// Catalog grouped search for products created in a date range.
    ///
    /// Returns the eligible items and the vendor's total result count.
    #[instrument(skip(self, range, page))]
    pub(crate) async fn grouped_search(
        &self,
        shape: ProductShape,
        range: &DateRange,
        page: Page,
    ) -> Result<(Vec<Document>, usize), ChannelError> {
        let start = format_gmt(range.start);
        let end = format_gmt(range.end);
        tracing::info!("Searching for {} products created between {start} and {end}", shape.name());

        let supplier_ids: Vec<SupplierId> = self
            .config()
            .supplier_ids()
            .into_iter()
            .map(SupplierId::new)
            .collect();
        let vendor_ids = supplier_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");

        let mut query = vec![
            ("VendorIds", vendor_ids),
            ("CreatedFromUtc", start),
            ("CreatedToUtc", end),
        ];
        if shape == ProductShape::Matrix {
            query.push(("HasChildProducts", "true".to_string()));
        }
        query.push(("Page", page.number.to_string()));
        query.push(("PageSize", page.size.to_string()));
        query.push(("OrderBy", "dateAdded".to_string()));

        let reply = self
            .client()
            .get(Service::Catalogs, &self.company_path("/Catalog/GroupedSearch"), &query)
            .await?;

        let items = reply.body.get("Items").and_then(Value::as_array);
        let total = reply
            .body
            .get("MetaData")
            .and_then(|meta| meta.get("TotalResults"))
            .and_then(total_results);
        let (Some(items), Some(total)) = (items, total) else {
            return Err(ChannelError::UnexpectedResponse(
                "Response is not in expected format, expected Items[] and MetaData.TotalResults properties."
                    .to_string(),
            ));
        };

        let items = items.iter().cloned().map(into_document);
        let eligible = match shape {
            ProductShape::Simple => items
                .filter_map(|mut item| {
                    if !is_non_empty_array(item.get("Products").unwrap_or(&Value::Null)) {
                        return is_subscribed(&item, &supplier_ids).then_some(item);
                    }
                    retain_subscribed_products(&mut item, &supplier_ids);
                    (!item.array_field("Products").is_empty()).then_some(item)
                })
                .collect(),
            ProductShape::Matrix => items
                .filter_map(|mut item| {
                    retain_subscribed_products(&mut item, &supplier_ids);
                    (item.array_field("Products").len() > 1).then_some(item)
                })
                .collect(),
        };
        Ok((eligible, total))
    }
}

fn retain_subscribed_products(item: &mut Document, supplier_ids: &[SupplierId]) {
    if let Some(Value::Array(products)) = item.get_mut("Products") {
        products.retain(|product| product.as_object().is_some_and(|p| is_subscribed(p, supplier_ids)));
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // counts are small non-negative numbers
fn total_results(value: &Value) -> Option<usize> {
    let total = value.as_f64()?;
    Some(total.max(0.0) as usize)
}

fn collect_detail_key(doc: &Document, catalog_ids: &mut Vec<String>, slugs: &mut Vec<String>) {
    if let Some(id) = catalog_item_id(doc) {
        push_unique(catalog_ids, id);
    } else if let Some(slug) = doc.str_field("Slug") {
        push_unique(slugs, slug);
    }
}

fn merge_detail(doc: &mut Document, catalog_details: &Document, slug_details: &Document) {
    let detail = if let Some(id) = catalog_item_id(doc) {
        catalog_details.object_field(id).cloned()
    } else {
        doc.str_field("Slug")
            .and_then(|slug| slug_details.object_field(slug))
            .cloned()
    };
    if let Some(detail) = detail {
        doc.merge(&detail);
    }
}
