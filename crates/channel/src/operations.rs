//! Hub operation names and dispatch.
//!
//! The hub addresses operations by name (`getCustomerById`,
//! `insertSalesOrder`, ...) and passes either a query document or a payload.
//! [`DropshipChannel::execute`] routes a named operation to its handler and
//! always answers with an envelope, failures included.

use std::fmt;
use std::str::FromStr;

use iqmetrix_dropship_core::{Envelope, Payload, QueryKind};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::channel::{DropshipChannel, parse_query};
use crate::error::ChannelError;
use crate::extract;

/// Records the hub can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Customer,
    ProductSimple,
    ProductMatrix,
    ProductQuantity,
    ProductPricing,
    Fulfillment,
    PaymentCapture,
}

impl Resource {
    pub const ALL: [Self; 7] = [
        Self::Customer,
        Self::ProductSimple,
        Self::ProductMatrix,
        Self::ProductQuantity,
        Self::ProductPricing,
        Self::Fulfillment,
        Self::PaymentCapture,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::ProductSimple => "ProductSimple",
            Self::ProductMatrix => "ProductMatrix",
            Self::ProductQuantity => "ProductQuantity",
            Self::ProductPricing => "ProductPricing",
            Self::Fulfillment => "Fulfillment",
            Self::PaymentCapture => "PaymentCapture",
        }
    }
}

/// How a query operation selects records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryMode {
    ById,
    ByCreatedTimeRange,
    ByModifiedTimeRange,
}

impl QueryMode {
    pub const ALL: [Self; 3] = [Self::ById, Self::ByCreatedTimeRange, Self::ByModifiedTimeRange];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ById => "ById",
            Self::ByCreatedTimeRange => "ByCreatedTimeRange",
            Self::ByModifiedTimeRange => "ByModifiedTimeRange",
        }
    }

    /// Whether a validated query is the kind this mode names.
    #[must_use]
    pub const fn accepts(self, kind: &QueryKind) -> bool {
        matches!(
            (self, kind),
            (Self::ById, QueryKind::RemoteIds(_))
                | (Self::ByCreatedTimeRange, QueryKind::CreatedDateRange(_))
                | (Self::ByModifiedTimeRange, QueryKind::ModifiedDateRange(_))
        )
    }
}

/// A hub operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `get{Resource}{Mode}`, driven by a query document.
    Get(Resource, QueryMode),
    InsertCustomer,
    UpdateCustomer,
    InsertCustomerAddress,
    UpdateCustomerAddress,
    InsertCustomerContact,
    UpdateCustomerContact,
    InsertSalesOrder,
    ExtractBillingAddressFromSalesOrder,
    ExtractShippingAddressFromSalesOrder,
    ExtractCustomerFromSalesOrder,
    ExtractCustomerAddressesFromCustomer,
    ExtractCustomerContactsFromCustomer,
}

const PAYLOAD_OPERATIONS: [Operation; 12] = [
    Operation::InsertCustomer,
    Operation::UpdateCustomer,
    Operation::InsertCustomerAddress,
    Operation::UpdateCustomerAddress,
    Operation::InsertCustomerContact,
    Operation::UpdateCustomerContact,
    Operation::InsertSalesOrder,
    Operation::ExtractBillingAddressFromSalesOrder,
    Operation::ExtractShippingAddressFromSalesOrder,
    Operation::ExtractCustomerFromSalesOrder,
    Operation::ExtractCustomerAddressesFromCustomer,
    Operation::ExtractCustomerContactsFromCustomer,
];

impl Operation {
    /// Every operation, query operations first.
    #[must_use]
    pub fn all() -> Vec<Self> {
        Resource::ALL
            .iter()
            .flat_map(|resource| QueryMode::ALL.iter().map(|mode| Self::Get(*resource, *mode)))
            .chain(PAYLOAD_OPERATIONS)
            .collect()
    }

    /// Whether the operation takes a query document rather than a payload.
    #[must_use]
    pub const fn is_query(self) -> bool {
        matches!(self, Self::Get(..))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get(resource, mode) => return write!(f, "get{}{}", resource.name(), mode.name()),
            Self::InsertCustomer => "insertCustomer",
            Self::UpdateCustomer => "updateCustomer",
            Self::InsertCustomerAddress => "insertCustomerAddress",
            Self::UpdateCustomerAddress => "updateCustomerAddress",
            Self::InsertCustomerContact => "insertCustomerContact",
            Self::UpdateCustomerContact => "updateCustomerContact",
            Self::InsertSalesOrder => "insertSalesOrder",
            Self::ExtractBillingAddressFromSalesOrder => "extractBillingAddressFromSalesOrder",
            Self::ExtractShippingAddressFromSalesOrder => "extractShippingAddressFromSalesOrder",
            Self::ExtractCustomerFromSalesOrder => "extractCustomerFromSalesOrder",
            Self::ExtractCustomerAddressesFromCustomer => "extractCustomerAddressesFromCustomer",
            Self::ExtractCustomerContactsFromCustomer => "extractCustomerContactsFromCustomer",
        };
        f.write_str(name)
    }
}

/// An operation name the channel does not implement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown operation '{0}'")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|op| op.to_string() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

fn parse_payload(input: Value) -> Result<Payload, ChannelError> {
    serde_json::from_value(input).map_err(|e| ChannelError::InvalidPayload(format!("Malformed payload: {e}")))
}

impl DropshipChannel {
    /// Run a hub operation.
    ///
    /// Failures are logged and returned as failure envelopes carrying the
    /// mapped hub status.
    #[instrument(skip_all, fields(operation = %operation))]
    pub async fn execute(&self, operation: Operation, input: Value) -> Envelope<Value> {
        tracing::info!("Executing {operation}");
        match self.dispatch(operation, input).await {
            Ok(envelope) => {
                tracing::info!(status = envelope.status_code.code(), "{operation} completed");
                envelope
            }
            Err(e) => e.into_envelope(),
        }
    }

    async fn dispatch(&self, operation: Operation, input: Value) -> Result<Envelope<Value>, ChannelError> {
        let Operation::Get(resource, mode) = operation else {
            return self.dispatch_payload(operation, parse_payload(input)?).await;
        };

        let query = parse_query(&input)?;
        if !mode.accepts(&query.kind) {
            return Err(ChannelError::InvalidPayload(format!(
                "{operation} cannot be called with a {} query.",
                query.kind.name()
            )));
        }

        let envelope = match resource {
            Resource::Customer => self.get_customers(&input).await?,
            Resource::ProductSimple => self.get_product_simple(&input).await?,
            Resource::ProductMatrix => self.get_product_matrix(&input).await?,
            Resource::ProductQuantity => self.get_product_quantity(&input).await?,
            Resource::ProductPricing => self.get_product_pricing(&input).await?,
            Resource::Fulfillment => self.get_fulfillments(&input).await?,
            Resource::PaymentCapture => self.get_payment_captures(&input).await?,
        };
        Ok(envelope.map(Value::Array))
    }

    async fn dispatch_payload(&self, operation: Operation, payload: Payload) -> Result<Envelope<Value>, ChannelError> {
        match operation {
            Operation::InsertCustomer => self.insert_customer(&payload).await,
            Operation::UpdateCustomer => self.update_customer(&payload).await,
            Operation::InsertCustomerAddress => self.insert_customer_address(&payload).await,
            Operation::UpdateCustomerAddress => self.update_customer_address(&payload).await,
            Operation::InsertCustomerContact => self.insert_customer_contact(&payload).await,
            Operation::UpdateCustomerContact => self.update_customer_contact(&payload).await,
            Operation::InsertSalesOrder => self.insert_sales_order(&payload).await,
            Operation::ExtractBillingAddressFromSalesOrder => Ok(extract::billing_address_from_sales_order(&payload)),
            Operation::ExtractShippingAddressFromSalesOrder => {
                Ok(extract::shipping_address_from_sales_order(&payload))
            }
            Operation::ExtractCustomerFromSalesOrder => Ok(extract::customer_from_sales_order(&payload)),
            Operation::ExtractCustomerAddressesFromCustomer => Ok(extract::customer_addresses_from_customer(&payload)),
            Operation::ExtractCustomerContactsFromCustomer => Ok(extract::customer_contacts_from_customer(&payload)),
            Operation::Get(..) => Err(ChannelError::InvalidPayload(format!(
                "{operation} takes a query document."
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::tests::config;
    use iqmetrix_dropship_core::HubStatus;
    use serde_json::json;

    #[test]
    fn test_names_round_trip() {
        let all = Operation::all();
        assert_eq!(all.len(), 33);
        for op in all {
            assert_eq!(op.to_string().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn test_hub_names() {
        assert_eq!(
            "getCustomerById".parse::<Operation>().unwrap(),
            Operation::Get(Resource::Customer, QueryMode::ById)
        );
        assert_eq!(
            "getPaymentCaptureByModifiedTimeRange".parse::<Operation>().unwrap(),
            Operation::Get(Resource::PaymentCapture, QueryMode::ByModifiedTimeRange)
        );
        assert_eq!(
            "extractCustomerFromSalesOrder".parse::<Operation>().unwrap(),
            Operation::ExtractCustomerFromSalesOrder
        );
        assert!("getOrders".parse::<Operation>().is_err());
    }

    #[tokio::test]
    async fn test_execute_extract() {
        let channel = DropshipChannel::new(config()).unwrap();
        let envelope = channel
            .execute(
                Operation::ExtractCustomerFromSalesOrder,
                json!({"doc": {"Customer": {"FirstName": "Ada"}}}),
            )
            .await;
        assert_eq!(envelope.status_code, HubStatus::Ok);
        assert_eq!(envelope.payload, json!({"FirstName": "Ada"}));
    }

    #[tokio::test]
    async fn test_execute_rejects_mismatched_query() {
        let channel = DropshipChannel::new(config()).unwrap();
        let envelope = channel
            .execute(
                Operation::Get(Resource::Customer, QueryMode::ByCreatedTimeRange),
                json!({"remoteIDs": ["1"]}),
            )
            .await;
        assert_eq!(envelope.status_code, HubStatus::BadRequest);
        assert!(envelope.errors[0].contains("remoteIDs"));
    }

    #[tokio::test]
    async fn test_execute_invalid_query() {
        let channel = DropshipChannel::new(config()).unwrap();
        let envelope = channel
            .execute(Operation::Get(Resource::ProductSimple, QueryMode::ById), json!({}))
            .await;
        assert_eq!(envelope.status_code, HubStatus::BadRequest);
        assert_eq!(envelope.payload, Value::Null);
    }
}
