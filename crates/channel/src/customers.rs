//! Customer, address and contact method operations (iQmetrix CRM).

use iqmetrix_dropship_core::{DateRange, Envelope, Page, Payload, Query, QueryKind, format_gmt};
use iqmetrix_dropship_core::payload::non_blank;
use serde_json::Value;
use tracing::instrument;

use crate::channel::{DropshipChannel, parse_query};
use crate::client::Service;
use crate::document::{Document, DocumentExt, into_document, resolve_id};
use crate::error::ChannelError;

impl DropshipChannel {
    /// Get customers by remote id, created date range or modified date range.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` if the query is invalid or a vendor call fails.
    #[instrument(skip(self, query_doc))]
    pub async fn get_customers(&self, query_doc: &Value) -> Result<Envelope<Vec<Value>>, ChannelError> {
        let query = parse_query(query_doc)?;

        let envelope = match &query.kind {
            QueryKind::RemoteIds(_) => self.customers_by_id(&query).await?,
            QueryKind::CreatedDateRange(range) => {
                tracing::warn!(
                    "Searching by createdDateRange is not supported, will search on modifiedDateRange instead."
                );
                self.customers_modified_since(range, query.page).await?
            }
            QueryKind::ModifiedDateRange(range) => self.customers_modified_since(range, query.page).await?,
        };

        if envelope.payload.is_empty() {
            tracing::info!("No customers found.");
        } else {
            tracing::info!("Submitting {} customer(s)...", envelope.payload.len());
        }
        Ok(envelope)
    }

    async fn customers_by_id(&self, query: &Query) -> Result<Envelope<Vec<Value>>, ChannelError> {
        let ids = query.unique_remote_ids();
        let batch = query.page.slice(&ids);

        let customers = self.fan_out(batch, |id| self.customer_full(id)).await?;
        Ok(Envelope::page(customers, query.page.has_more(ids.len())))
    }

    async fn customer_full(&self, id: &String) -> Result<Value, ChannelError> {
        tracing::info!(customer_id = %id, "Getting Customer from iQmetrix...");
        let reply = self
            .client()
            .get(Service::Crm, &self.company_path(&format!("/CustomerFull({id})")), &[])
            .await?;

        let has_id = reply
            .body
            .as_object()
            .is_some_and(|doc| doc.id_field("Id").is_some());
        if !has_id {
            return Err(ChannelError::UnexpectedResponse(
                "CustomerFull response is not in expected format, expected Id property.".to_string(),
            ));
        }
        Ok(reply.body)
    }

    async fn customers_modified_since(
        &self,
        range: &DateRange,
        page: Page,
    ) -> Result<Envelope<Vec<Value>>, ChannelError> {
        tracing::warn!(
            "EndDate will be ignored when searching on modified date range (will use StartDate to Now)."
        );
        tracing::info!("Getting Customers from iQmetrix...");

        let query = [
            (
                "$filter",
                format!("LastModifiedDateUtc ge datetime'{}'", format_gmt(range.start)),
            ),
            ("$skip", page.offset().to_string()),
            ("$top", page.size.to_string()),
        ];
        let reply = self
            .client()
            .get(Service::Crm, &self.company_path("/CustomerFull"), &query)
            .await?;

        let Value::Array(customers) = reply.body else {
            return Err(ChannelError::UnexpectedResponse(
                "CustomerFull response is not in expected format, expected an array.".to_string(),
            ));
        };

        let has_more = customers.len() >= page.size as usize;
        Ok(Envelope::page(customers, has_more).with_endpoint_status(Some(reply.status)))
    }

    /// Create a customer.
    ///
    /// The response is enriched with the request's `Addresses` and
    /// `ContactMethods` so the hub can continue with them.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` if the vendor call fails.
    #[instrument(skip(self, payload))]
    pub async fn insert_customer(&self, payload: &Payload) -> Result<Envelope<Value>, ChannelError> {
        tracing::info!("Inserting new customer record...");
        let reply = self
            .client()
            .post(Service::Crm, &self.company_path("/Customers"), &Value::Object(payload.doc.clone()))
            .await?;

        let customer = with_children(reply.body, &payload.doc);
        Ok(Envelope::created(customer).with_endpoint_status(Some(reply.status)))
    }

    /// Update an existing customer.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::InvalidPayload` when no customer id is known,
    /// or the vendor error.
    #[instrument(skip(self, payload))]
    pub async fn update_customer(&self, payload: &Payload) -> Result<Envelope<Value>, ChannelError> {
        tracing::info!("Updating existing customer record...");
        let customer_id = require_id(&payload.doc, "Id", &[non_blank(payload.customer_remote_id.as_ref())], "customer")?;

        let reply = self
            .client()
            .put(
                Service::Crm,
                &self.company_path(&format!("/Customers({customer_id})")),
                &Value::Object(payload.doc.clone()),
            )
            .await?;

        let customer = with_children(reply.body, &payload.doc);
        Ok(Envelope::ok(customer).with_endpoint_status(Some(reply.status)))
    }

    /// Add an address to a customer.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::InvalidPayload` when no customer id is known,
    /// or the vendor error.
    #[instrument(skip(self, payload))]
    pub async fn insert_customer_address(&self, payload: &Payload) -> Result<Envelope<Value>, ChannelError> {
        tracing::info!("Inserting new customer address record...");
        let customer_id = owning_customer(payload)?;

        let reply = self
            .client()
            .post(
                Service::Crm,
                &self.company_path(&format!("/Customers({customer_id})/Addresses")),
                &Value::Object(payload.doc.clone()),
            )
            .await?;

        Ok(Envelope::created(reply.body).with_endpoint_status(Some(reply.status)))
    }

    /// Update an existing customer address.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::InvalidPayload` when the customer or address id
    /// is unknown, or the vendor error.
    #[instrument(skip(self, payload))]
    pub async fn update_customer_address(&self, payload: &Payload) -> Result<Envelope<Value>, ChannelError> {
        tracing::info!("Updating existing customer address record...");
        let customer_id = owning_customer(payload)?;
        let address_id = require_id(
            &payload.doc,
            "Id",
            &[non_blank(payload.customer_address_remote_id.as_ref())],
            "customer address",
        )?;

        let reply = self
            .client()
            .put(
                Service::Crm,
                &self.company_path(&format!("/Customers({customer_id})/Addresses({address_id})")),
                &Value::Object(payload.doc.clone()),
            )
            .await?;

        Ok(Envelope::ok(reply.body).with_endpoint_status(Some(reply.status)))
    }

    /// Add a contact method to a customer.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::InvalidPayload` when no customer id is known,
    /// or the vendor error.
    #[instrument(skip(self, payload))]
    pub async fn insert_customer_contact(&self, payload: &Payload) -> Result<Envelope<Value>, ChannelError> {
        tracing::info!("Inserting new customer contact record...");
        let customer_id = owning_customer(payload)?;

        let reply = self
            .client()
            .post(
                Service::Crm,
                &self.company_path(&format!("/Customers({customer_id})/ContactMethods")),
                &Value::Object(payload.doc.clone()),
            )
            .await?;

        Ok(Envelope::created(reply.body).with_endpoint_status(Some(reply.status)))
    }

    /// Update an existing customer contact method.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::InvalidPayload` when the customer or contact id
    /// is unknown, or the vendor error.
    #[instrument(skip(self, payload))]
    pub async fn update_customer_contact(&self, payload: &Payload) -> Result<Envelope<Value>, ChannelError> {
        tracing::info!("Updating existing customer contact record...");
        let customer_id = owning_customer(payload)?;
        let contact_id = require_id(
            &payload.doc,
            "Id",
            &[non_blank(payload.customer_contact_remote_id.as_ref())],
            "customer contact",
        )?;

        let reply = self
            .client()
            .put(
                Service::Crm,
                &self.company_path(&format!("/Customers({customer_id})/ContactMethods({contact_id})")),
                &Value::Object(payload.doc.clone()),
            )
            .await?;

        Ok(Envelope::ok(reply.body).with_endpoint_status(Some(reply.status)))
    }
}

fn owning_customer(payload: &Payload) -> Result<String, ChannelError> {
    require_id(
        &payload.doc,
        "CustomerId",
        &[non_blank(payload.customer_remote_id.as_ref())],
        "customer",
    )
}

fn require_id(doc: &Document, key: &str, fallbacks: &[Option<&str>], what: &str) -> Result<String, ChannelError> {
    resolve_id(doc, key, fallbacks)
        .ok_or_else(|| ChannelError::InvalidPayload(format!("No {what} id in doc.{key} or the payload remote ids.")))
}

/// The vendor's customer document plus the request's child collections.
fn with_children(body: Value, request: &Document) -> Value {
    let mut customer = into_document(body);
    for key in ["Addresses", "ContactMethods"] {
        let children = request
            .get(key)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        customer.insert(key.to_string(), children);
    }
    Value::Object(customer)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_children_defaults_to_empty() {
        let request = into_document(json!({"PrimaryName": "Ada"}));
        let customer = with_children(json!({"Id": "c-1"}), &request);
        assert_eq!(
            customer,
            json!({"Id": "c-1", "Addresses": [], "ContactMethods": []})
        );
    }

    #[test]
    fn test_with_children_copies_request_collections() {
        let request = into_document(json!({"Addresses": [{"Id": "a"}], "ContactMethods": [{"Id": "m"}]}));
        let customer = with_children(json!({"Id": "c-1", "Addresses": null}), &request);
        assert_eq!(customer["Addresses"], json!([{"Id": "a"}]));
        assert_eq!(customer["ContactMethods"], json!([{"Id": "m"}]));
    }

    #[test]
    fn test_owning_customer_prefers_doc() {
        let mut payload = Payload::from_doc(into_document(json!({"CustomerId": "doc-c"})));
        payload.customer_remote_id = Some("remote-c".to_string());
        assert_eq!(owning_customer(&payload).unwrap(), "doc-c");

        payload.doc.remove("CustomerId");
        assert_eq!(owning_customer(&payload).unwrap(), "remote-c");

        payload.customer_remote_id = Some("  ".to_string());
        assert!(matches!(owning_customer(&payload), Err(ChannelError::InvalidPayload(_))));
    }
}
