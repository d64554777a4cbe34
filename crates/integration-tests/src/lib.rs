//! End-to-end tests for the iQmetrix dropship channel.
//!
//! Every test runs hub operations through [`DropshipChannel::execute`]
//! against a [`wiremock`] server standing in for all iQmetrix services. The
//! profile's `baseUrlTemplate` routes each service to `/{service}` on the
//! mock server, so mocks are mounted on paths such as
//! `/crm/v1/Companies(13149)/CustomerFull(42)`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p iqmetrix-dropship-integration-tests
//! ```

use iqmetrix_dropship_channel::{DropshipChannel, Operation};
use iqmetrix_dropship_core::Envelope;
use serde_json::{Value, json};
use wiremock::MockServer;

pub const COMPANY_ID: &str = "13149";
pub const LOCATION_ID: &str = "13150";
pub const SUPPLIER_ID: i64 = 7187;
pub const LIST_ID: &str = "list-a";

/// A mocked iQmetrix API and a channel pointed at it.
pub struct TestContext {
    pub server: MockServer,
    pub channel: DropshipChannel,
}

impl TestContext {
    /// Start a mock server and build a channel with the default profile.
    ///
    /// # Panics
    ///
    /// Panics if the profile is rejected.
    pub async fn new() -> Self {
        Self::with_profile(|_| {}).await
    }

    /// Start a mock server and build a channel from the default profile
    /// after `customize` has edited it.
    ///
    /// # Panics
    ///
    /// Panics if the profile is rejected.
    #[allow(clippy::unwrap_used)]
    pub async fn with_profile(customize: impl FnOnce(&mut Value)) -> Self {
        let server = MockServer::start().await;
        let mut profile = profile(&server.uri());
        customize(&mut profile);
        let channel = DropshipChannel::from_profile(&profile).unwrap();
        Self { server, channel }
    }

    /// Run a hub operation by name.
    ///
    /// # Panics
    ///
    /// Panics if the operation name is unknown.
    #[allow(clippy::unwrap_used)]
    pub async fn run(&self, operation: &str, input: Value) -> Envelope<Value> {
        let operation: Operation = operation.parse().unwrap();
        self.channel.execute(operation, input).await
    }

    /// Mock-server path for a company-scoped resource of `service`.
    #[must_use]
    pub fn company_path(service: &str, rest: &str) -> String {
        format!("/{service}/v1/Companies({COMPANY_ID}){rest}")
    }
}

/// Channel profile routing every service to the mock server.
#[must_use]
pub fn profile(server_uri: &str) -> Value {
    json!({
        "channelSettingsValues": {
            "protocol": "http",
            "environment": "demo",
            "baseUrlTemplate": format!("{server_uri}/{{service}}"),
            "subscriptionLists": [{"listId": LIST_ID, "supplierId": SUPPLIER_ID}],
            "canPostInvoice": "SalesOrders",
            "maxConcurrency": 4
        },
        "channelAuthValues": {
            "company_id": COMPANY_ID,
            "location_id": LOCATION_ID,
            "access_token": "aW50ZWdyYXRpb24tdGVzdHM"
        },
        "paymentCaptureBusinessReferences": ["invoiceNumber"],
        "salesOrderBusinessReferences": ["dropshipOrderItems.0.dropshipOrderId"]
    })
}

/// Date range query document for one day in January 2024.
#[must_use]
pub fn january_range(kind: &str) -> Value {
    json!({
        kind: {"startDateGMT": "2024-01-01T00:00:00Z", "endDateGMT": "2024-01-02T00:00:00Z"},
        "page": 1,
        "pageSize": 25
    })
}
