//! Fulfillment and payment capture operations against mocked order reporting.

use iqmetrix_dropship_core::HubStatus;
use iqmetrix_dropship_integration_tests::{TestContext, january_range};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn mount_order_detail(ctx: &TestContext, id: &str) {
    Mock::given(method("GET"))
        .and(path(TestContext::company_path(
            "ordermanagementreporting",
            &format!("/OrderDetails({id})"),
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "invoiceNumber": format!("INV-{id}"),
            "dropshipOrderItems": [{"dropshipOrderId": format!("d-{id}")}]
        })))
        .mount(&ctx.server)
        .await;
}

#[tokio::test]
async fn test_fulfillments_by_modified_range() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path("/ordermanagementreporting/v1/Reports/OrderList/report"))
        .and(query_param(
            "filter",
            "companyId eq 13149 and statusName eq Completed and locationId eq 13150 \
             and updatedUtc gt 2023-12-31T23:59:59.999Z and updatedUtc lt 2024-01-02T00:00:00.001Z",
        ))
        .and(query_param("sortOrder", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [{"_id": "1"}, {"_id": "2"}],
            "totalRecords": 2
        })))
        .mount(&ctx.server)
        .await;
    mount_order_detail(&ctx, "1").await;
    mount_order_detail(&ctx, "2").await;
    Mock::given(method("GET"))
        .and(path(TestContext::company_path("order", "/OrderFull")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"Id": "full"}])))
        .mount(&ctx.server)
        .await;

    let envelope = ctx
        .run("getFulfillmentByModifiedTimeRange", january_range("modifiedDateRange"))
        .await;

    assert_eq!(envelope.status_code, HubStatus::Ok);
    let fulfillments = envelope.payload.as_array().unwrap();
    assert_eq!(fulfillments.len(), 2);
    assert_eq!(fulfillments[1]["invoiceNumber"], json!("INV-2"));
    assert_eq!(fulfillments[1]["orderFull"], json!({"Id": "full"}));
}

#[tokio::test]
async fn test_payment_captures_by_id() {
    let ctx = TestContext::new().await;
    mount_order_detail(&ctx, "1").await;

    let envelope = ctx.run("getPaymentCaptureById", json!({"remoteIDs": ["1"]})).await;

    assert_eq!(envelope.status_code, HubStatus::Ok);
    assert_eq!(
        envelope.payload[0],
        json!({
            "statusCode": 200,
            "paymentCaptureRemoteID": "1",
            "paymentCaptureBusinessReference": "INV-1",
            "salesOrderRemoteID": "d-1",
            "salesOrderBusinessReference": "d-1",
            "doc": {
                "id": "1",
                "invoiceNumber": "INV-1",
                "dropshipOrderItems": [{"dropshipOrderId": "d-1"}]
            }
        })
    );
}

#[tokio::test]
async fn test_payment_captures_require_business_references() {
    let ctx = TestContext::with_profile(|profile| {
        profile["paymentCaptureBusinessReferences"] = json!([]);
    })
    .await;

    let envelope = ctx.run("getPaymentCaptureById", json!({"remoteIDs": ["1"]})).await;

    assert_eq!(envelope.status_code, HubStatus::BadRequest);
    assert!(ctx.server.received_requests().await.unwrap().is_empty());
}
