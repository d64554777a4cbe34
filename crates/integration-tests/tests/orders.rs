//! Sales order submission against mocked catalog, order and sales order services.

use iqmetrix_dropship_core::HubStatus;
use iqmetrix_dropship_integration_tests::{SUPPLIER_ID, TestContext};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn sales_order() -> Value {
    json!({
        "doc": {
            "DropshipOrder": {"Items": [{"SKU": "V-1", "SupplierEntityId": SUPPLIER_ID, "Quantity": 1}]},
            "SalesOrder": {"Items": [{"CorrelationId": "V-1", "SupplierEntityId": SUPPLIER_ID}]}
        },
        "customerRemoteID": "c-1",
        "shippingCustomerRemoteID": "c-1",
        "shippingAddressRemoteID": "a-2"
    })
}

async fn mount_catalog_lookup(ctx: &TestContext) {
    Mock::given(method("GET"))
        .and(path(TestContext::company_path("catalogs", "/Catalog/Items/ByVendorSku")))
        .and(query_param("vendorsku", "V-1"))
        .and(query_param("vendorid", SUPPLIER_ID.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Items": [{"CatalogItemId": "cat-1"}]})))
        .mount(&ctx.server)
        .await;
}

#[tokio::test]
async fn test_insert_sales_order() {
    let ctx = TestContext::new().await;
    mount_catalog_lookup(&ctx).await;
    Mock::given(method("POST"))
        .and(path(TestContext::company_path("order", "/OrderFull")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"Id": "o-1"})))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::company_path("order", "/Orders(o-1)/Process")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Id": "o-1"})))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::company_path("salesorder", "/SalesOrders")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"Id": "s-1"})))
        .mount(&ctx.server)
        .await;

    let envelope = ctx.run("insertSalesOrder", sales_order()).await;

    assert_eq!(envelope.status_code, HubStatus::Created);
    assert_eq!(envelope.endpoint_status_code, Some(201));
    assert_eq!(envelope.payload["SalesOrder"]["Id"], json!("s-1"));

    let requests = ctx.server.received_requests().await.unwrap();
    let sales: Value = requests
        .iter()
        .find(|r| r.url.path().ends_with("/SalesOrders"))
        .unwrap()
        .body_json()
        .unwrap();
    assert_eq!(sales["CustomerId"], json!("c-1"));
    assert_eq!(sales["ShippingAddressId"], json!("a-2"));
    assert_eq!(sales["DropshipOrderId"], json!("o-1"));
    assert_eq!(sales["Items"][0]["ProductCatalogId"], json!("cat-1"));
}

#[tokio::test]
async fn test_unknown_vendor_sku_stops_before_ordering() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path(TestContext::company_path("catalogs", "/Catalog/Items/ByVendorSku")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Items": []})))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let envelope = ctx.run("insertSalesOrder", sales_order()).await;

    assert_eq!(envelope.status_code, HubStatus::BadRequest);
    assert!(envelope.errors[0].starts_with("Unable to find catalog id for vendorSku = 'V-1'"));
}

#[tokio::test]
async fn test_sales_order_failure_is_a_bad_request() {
    let ctx = TestContext::new().await;
    mount_catalog_lookup(&ctx).await;
    Mock::given(method("POST"))
        .and(path(TestContext::company_path("order", "/OrderFull")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"Id": "o-1"})))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::company_path("order", "/Orders(o-1)/Process")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Id": "o-1"})))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::company_path("salesorder", "/SalesOrders")))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&ctx.server)
        .await;

    let envelope = ctx.run("insertSalesOrder", sales_order()).await;

    assert_eq!(envelope.status_code, HubStatus::BadRequest);
    assert_eq!(envelope.endpoint_status_code, Some(400));
    assert!(envelope.errors[0].starts_with("Posting sales order failed"));
    assert_eq!(envelope.payload["DropshipOrder"]["Id"], json!("o-1"));
    assert_eq!(envelope.payload["ProcessResult"]["Id"], json!("o-1"));
    assert!(envelope.payload.get("SalesOrder").is_none());
}

#[tokio::test]
async fn test_process_failure_keeps_created_dropship_order() {
    let ctx = TestContext::new().await;
    mount_catalog_lookup(&ctx).await;
    Mock::given(method("POST"))
        .and(path(TestContext::company_path("order", "/OrderFull")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"Id": "o-1"})))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::company_path("order", "/Orders(o-1)/Process")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::company_path("salesorder", "/SalesOrders")))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let envelope = ctx.run("insertSalesOrder", sales_order()).await;

    assert_eq!(envelope.status_code, HubStatus::BadRequest);
    assert_eq!(envelope.endpoint_status_code, Some(400));
    assert!(envelope.errors[0].starts_with("Processing dropship order failed"));
    assert_eq!(envelope.payload, json!({"DropshipOrder": {"Id": "o-1"}}));
}
