//! Sales order submission.
//!
//! A hub sales order becomes an iQmetrix dropship order plus a sales order
//! (invoice). Items are resolved to catalog ids by vendor SKU, the dropship
//! order is created and processed, then the sales order is posted against it.
//! A failure after the dropship order exists leaves it in place.

use iqmetrix_dropship_core::payload::non_blank;
use iqmetrix_dropship_core::{Envelope, Payload};
use serde_json::{Value, json};
use tracing::instrument;

use crate::channel::DropshipChannel;
use crate::client::Service;
use crate::document::{Document, DocumentExt, id_string};
use crate::error::ChannelError;

/// A vendor SKU and the supplier that carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CatalogKey {
    vendor_sku: String,
    supplier_id: String,
}

impl CatalogKey {
    fn from_item(item: &Value, sku_key: &str) -> Result<Self, ChannelError> {
        let vendor_sku = item.get(sku_key).and_then(id_string);
        let supplier_id = item.get("SupplierEntityId").and_then(id_string);
        match (vendor_sku, supplier_id) {
            (Some(vendor_sku), Some(supplier_id)) => Ok(Self { vendor_sku, supplier_id }),
            _ => Err(ChannelError::InvalidPayload(format!(
                "Order items require {sku_key} and SupplierEntityId."
            ))),
        }
    }
}

/// The two orders carried by a hub sales order document.
#[derive(Debug, Clone)]
struct OrderDocs {
    dropship: Document,
    sales: Document,
}

impl OrderDocs {
    fn from_payload(payload: &Payload) -> Result<Self, ChannelError> {
        let order = |key: &str| -> Result<Document, ChannelError> {
            let doc = payload.doc.object_field(key).ok_or_else(|| {
                ChannelError::InvalidPayload(format!("Sales order document requires a {key} object."))
            })?;
            if !doc.get("Items").is_some_and(Value::is_array) {
                return Err(ChannelError::InvalidPayload(format!("{key} requires an Items array.")));
            }
            Ok(doc.clone())
        };
        Ok(Self {
            dropship: order("DropshipOrder")?,
            sales: order("SalesOrder")?,
        })
    }

    /// Copy the remote ids the hub already knows onto both orders.
    fn stamp_remote_ids(&mut self, payload: &Payload) {
        let customer = non_blank(payload.customer_remote_id.as_ref());

        if let Some(billing_customer) = non_blank(payload.billing_customer_remote_id.as_ref()) {
            tracing::info!("Adding payload.billingCustomerRemoteID [{billing_customer}] to order.");
            self.dropship
                .insert("BillingCustomerId".to_string(), json!(billing_customer));
        }
        if let Some(billing_address) = non_blank(payload.billing_address_remote_id.as_ref()) {
            tracing::info!("Adding payload.billingAddressRemoteID [{billing_address}] to order.");
            self.dropship.insert("BillingAddressId".to_string(), json!(billing_address));
            self.sales.insert("BillingAddressId".to_string(), json!(billing_address));
        }
        if let Some(shipping_customer) = non_blank(payload.shipping_customer_remote_id.as_ref()) {
            tracing::info!("Adding payload.shippingCustomerRemoteID [{shipping_customer}] to order.");
            self.dropship
                .insert("ShippingCustomerId".to_string(), json!(shipping_customer));
        }
        if let Some(shipping_address) = non_blank(payload.shipping_address_remote_id.as_ref()) {
            tracing::info!("Adding payload.shippingAddressRemoteID [{shipping_address}] to order.");
            self.dropship.insert("ShippingAddressId".to_string(), json!(shipping_address));
            self.sales.insert("ShippingAddressId".to_string(), json!(shipping_address));
        }
        if let Some(customer) = customer {
            tracing::info!("Adding payload.customerRemoteID [{customer}] to order.");
            self.sales.insert("CustomerId".to_string(), json!(customer));
        }
    }

    /// Unique catalog keys across dropship items (`SKU`) and sales items
    /// (`CorrelationId`), in first-seen order.
    fn catalog_keys(&self) -> Result<Vec<CatalogKey>, ChannelError> {
        let mut keys: Vec<CatalogKey> = Vec::new();
        let items = self
            .dropship
            .array_field("Items")
            .iter()
            .map(|item| CatalogKey::from_item(item, "SKU"))
            .chain(
                self.sales
                    .array_field("Items")
                    .iter()
                    .map(|item| CatalogKey::from_item(item, "CorrelationId")),
            );
        for key in items {
            let key = key?;
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Set `ProductId` on dropship items and `ProductCatalogId` on sales items.
    fn assign_catalog_ids(&mut self, resolved: &[(CatalogKey, Value)]) -> Result<(), ChannelError> {
        assign(&mut self.dropship, "SKU", "ProductId", resolved)?;
        assign(&mut self.sales, "CorrelationId", "ProductCatalogId", resolved)
    }
}

fn assign(
    order: &mut Document,
    sku_key: &str,
    target: &str,
    resolved: &[(CatalogKey, Value)],
) -> Result<(), ChannelError> {
    if let Some(Value::Array(items)) = order.get_mut("Items") {
        for item in items.iter_mut() {
            let key = CatalogKey::from_item(item, sku_key)?;
            let catalog_id = resolved
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, id)| id.clone())
                .ok_or_else(|| ChannelError::Lookup(format!("No catalog id resolved for vendorSku = '{}'", key.vendor_sku)))?;
            if let Some(item) = item.as_object_mut() {
                item.insert(target.to_string(), catalog_id);
            }
        }
    }
    Ok(())
}

impl DropshipChannel {
    /// Create and process a dropship order, then post its sales order.
    ///
    /// The payload is `{DropshipOrder, ProcessResult, SalesOrder}` with the
    /// vendor responses of the three calls.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` if the payload is incomplete, an item SKU does
    /// not resolve to exactly one catalog item, or a vendor call fails.
    /// Failures after the dropship order was created are reported as
    /// `ChannelError::OrderStep`, carrying the responses received so far.
    #[instrument(skip(self, payload))]
    pub async fn insert_sales_order(&self, payload: &Payload) -> Result<Envelope<Value>, ChannelError> {
        let mut order = OrderDocs::from_payload(payload)?;
        order.stamp_remote_ids(payload);

        let keys = order.catalog_keys()?;
        tracing::info!("Getting product catalog ids...");
        let resolved = self
            .fan_out(keys, |key| async move {
                let catalog_id = self.catalog_id_for(&key).await?;
                Ok((key, catalog_id))
            })
            .await?;
        order.assign_catalog_ids(&resolved)?;

        let dropship_order = self.post_dropship_order(&order.dropship).await?;
        let Some(order_id) = dropship_order.get("Id").filter(|id| !id.is_null()).cloned() else {
            return Err(ChannelError::UnexpectedResponse(
                "Dropship order response is not in expected format, expected Id property.".to_string(),
            ));
        };

        let mut created = Document::new();
        created.insert("DropshipOrder".to_string(), dropship_order);

        let process_result = self
            .process_dropship_order(&order_id)
            .await
            .map_err(|e| e.in_step("Processing dropship order", Value::Object(created.clone())))?;
        created.insert("ProcessResult".to_string(), process_result);

        order.sales.insert("DropshipOrderId".to_string(), order_id);
        let (sales_order, status) = self
            .post_sales_order(&order.sales)
            .await
            .map_err(|e| e.in_step("Posting sales order", Value::Object(created.clone())))?;
        created.insert("SalesOrder".to_string(), sales_order);

        Ok(Envelope::created(Value::Object(created)).with_endpoint_status(Some(status)))
    }

    /// The single catalog item id for a vendor SKU and supplier.
    async fn catalog_id_for(&self, key: &CatalogKey) -> Result<Value, ChannelError> {
        let CatalogKey { vendor_sku, supplier_id } = key;
        tracing::info!("Getting Item Id for vendorSku = '{vendor_sku}' and supplierId = '{supplier_id}'...");

        let query = [("vendorsku", vendor_sku.clone()), ("vendorid", supplier_id.clone())];
        let reply = self
            .client()
            .get(Service::Catalogs, &self.company_path("/Catalog/Items/ByVendorSku"), &query)
            .await?;

        match reply.body.get("Items").and_then(Value::as_array).map(Vec::as_slice) {
            Some([item]) => {
                let catalog_id = item.get("CatalogItemId").cloned().unwrap_or(Value::Null);
                tracing::info!(
                    "Found catalog id '{catalog_id}' for vendorSku = '{vendor_sku}' and supplierId = '{supplier_id}'"
                );
                Ok(catalog_id)
            }
            Some([_, _, ..]) => Err(ChannelError::Lookup(format!(
                "Found multiple catalog ids for vendorSku = '{vendor_sku}' supplierId = '{supplier_id}'. Response: {}",
                reply.body
            ))),
            _ => Err(ChannelError::Lookup(format!(
                "Unable to find catalog id for vendorSku = '{vendor_sku}' and supplierId = '{supplier_id}'. Response: {}",
                reply.body
            ))),
        }
    }

    async fn post_dropship_order(&self, dropship: &Document) -> Result<Value, ChannelError> {
        tracing::info!("Posting dropship order...");
        let reply = self
            .client()
            .post(Service::Order, &self.company_path("/OrderFull"), &Value::Object(dropship.clone()))
            .await
            .inspect_err(|_| tracing::error!("Error posting dropship order."))?;

        let id = reply.body.get("Id").cloned().unwrap_or_default();
        tracing::info!("Successfully posted dropship order (id = {id}).");
        Ok(reply.body)
    }

    async fn process_dropship_order(&self, order_id: &Value) -> Result<Value, ChannelError> {
        tracing::info!("Processing dropship order...");
        let path = self.company_path(&format!("/Orders({})/Process", id_string(order_id).unwrap_or_default()));
        let reply = self
            .client()
            .post(Service::Order, &path, &json!({ "OrderId": order_id }))
            .await
            .inspect_err(|_| tracing::error!("Error processing dropship order."))?;

        let id = reply.body.get("Id").cloned().unwrap_or_default();
        tracing::info!("Successfully processed dropship order (id = {id}).");
        Ok(reply.body)
    }

    async fn post_sales_order(&self, sales: &Document) -> Result<(Value, u16), ChannelError> {
        tracing::info!("Posting sales order...");
        let path = self.company_path(&format!("/{}", self.config().sales_order_endpoint));
        let reply = self
            .client()
            .post(Service::SalesOrder, &path, &Value::Object(sales.clone()))
            .await
            .inspect_err(|_| tracing::error!("Error posting sales order."))?;

        let id = reply.body.get("Id").cloned().unwrap_or_default();
        tracing::info!("Successfully posted sales order (id = {id}).");
        Ok((reply.body, reply.status))
    }
}
