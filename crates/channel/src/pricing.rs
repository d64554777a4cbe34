//! Product pricing operations.

use iqmetrix_dropship_core::{Envelope, QueryKind, SubscriptionList};
use serde_json::Value;
use tracing::instrument;

use crate::channel::{DropshipChannel, parse_query};
use crate::client::Service;
use crate::document::{Document, DocumentExt, into_document};
use crate::error::ChannelError;
use crate::products::catalog::push_unique;

impl DropshipChannel {
    /// Get location pricing for the catalog items on every subscription list.
    ///
    /// A remote id query prices only the listed catalog items. Date range
    /// queries are not supported by the catalog list and price everything.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` if the query is invalid or a vendor call fails.
    #[instrument(skip(self, query_doc))]
    pub async fn get_product_pricing(&self, query_doc: &Value) -> Result<Envelope<Vec<Value>>, ChannelError> {
        let query = parse_query(query_doc)?;

        tracing::info!("Get product lists...");
        let lists = self
            .fan_out(&self.config().subscription_lists, |list| self.list_items(list))
            .await?;
        let mut products: Vec<Document> = lists.into_iter().flatten().collect();

        match &query.kind {
            QueryKind::RemoteIds(ids) => {
                products.retain(|p| p.str_field("CatalogItemId").is_some_and(|id| ids.iter().any(|r| r == id)));
            }
            kind => tracing::warn!(
                "{} query is not supported, will get prices for all products on subscription lists.",
                kind.name()
            ),
        }

        tracing::info!("Getting details for {} products.", products.len());
        let mut catalog_ids = Vec::new();
        for product in &products {
            if let Some(id) = product.str_field("CatalogItemId") {
                push_unique(&mut catalog_ids, id);
            }
        }
        let details = self.catalog_item_details(&catalog_ids).await?;

        for product in &mut products {
            let detail = product
                .str_field("CatalogItemId")
                .and_then(|id| details.get(id))
                .cloned()
                .unwrap_or(Value::Null);
            let vendor_sku = supplier_vendor_sku(&detail, product);
            product.insert("ProductDetails".to_string(), detail);
            product.insert("VendorSku".to_string(), vendor_sku);
        }

        let total = products.len();
        tracing::info!("Getting prices for {total} products...");
        let priced = self
            .fan_out(products.into_iter().enumerate(), |(index, product)| {
                self.with_pricing(product, index, total)
            })
            .await?;

        if priced.is_empty() {
            tracing::info!("No product prices found.");
            return Ok(Envelope::no_content());
        }
        tracing::info!("Submitting {} product prices...", priced.len());
        Ok(Envelope::ok(priced.into_iter().map(Value::Object).collect()))
    }

    /// Catalog items on a subscription list, annotated with the list.
    async fn list_items(&self, list: &SubscriptionList) -> Result<Vec<Document>, ChannelError> {
        tracing::info!("Get product list [{}]...", list.list_id);
        let path = self.company_path(&format!("/Catalog/Items(SourceId={})", list.list_id));
        let reply = self.client().get(Service::Catalogs, &path, &[]).await?;

        let Some(Value::Array(items)) = reply.body.get("Items") else {
            return Err(ChannelError::UnexpectedResponse(
                "Response is not in expected format, expected Items[] property.".to_string(),
            ));
        };
        Ok(items
            .iter()
            .cloned()
            .map(|item| {
                let mut item = into_document(item);
                item.insert("subscriptionList".to_string(), list.to_value());
                item
            })
            .collect())
    }

    async fn with_pricing(&self, mut product: Document, index: usize, total: usize) -> Result<Document, ChannelError> {
        let catalog_item_id = product.str_field("CatalogItemId").unwrap_or_default().to_string();
        tracing::info!("Getting price for product {} of {total} ({catalog_item_id})...", index + 1);

        let path = format!(
            "/v1/Companies({})/Entities({})/CatalogItems({catalog_item_id})/Pricing",
            self.config().company_id,
            self.config().location_id
        );
        let reply = self.client().get(Service::Pricing, &path, &[]).await?;

        let pricing = match reply.body {
            Value::Array(mut prices) if !prices.is_empty() => prices.swap_remove(0),
            _ => Value::Null,
        };
        product.insert("Pricing".to_string(), pricing);
        Ok(product)
    }
}

/// First vendor SKU in the product details supplied by the item's list supplier.
fn supplier_vendor_sku(detail: &Value, product: &Document) -> Value {
    let Some(supplier_id) = product.get("subscriptionList").and_then(|list| list.get("supplierId")) else {
        return Value::Null;
    };
    detail
        .get("VendorSkus")
        .and_then(Value::as_array)
        .and_then(|skus| {
            skus.iter()
                .find(|sku| sku.get("Entity").and_then(|entity| entity.get("Id")) == Some(supplier_id))
        })
        .cloned()
        .unwrap_or(Value::Null)
}
