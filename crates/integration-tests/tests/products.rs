//! Product, quantity and pricing operations against a mocked catalog.

use iqmetrix_dropship_core::HubStatus;
use iqmetrix_dropship_integration_tests::{LIST_ID, SUPPLIER_ID, TestContext, january_range};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn mount_structure(ctx: &TestContext, catalog_item_id: &str, structure: Value) {
    Mock::given(method("GET"))
        .and(path(TestContext::company_path(
            "catalogs",
            &format!("/Catalog/Items({catalog_item_id})/Structure"),
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(structure))
        .mount(&ctx.server)
        .await;
}

async fn mount_slug_details(ctx: &TestContext, products: Value) {
    Mock::given(method("GET"))
        .and(path("/productlibrary/v1/Products/GetBulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Products": products })))
        .mount(&ctx.server)
        .await;
}

fn on_list(slug: &str) -> Value {
    json!({"Slug": slug, "CatalogItems": [{"SourceIds": [LIST_ID]}]})
}

#[tokio::test]
async fn test_simple_product_by_id_folds_single_variation() {
    let ctx = TestContext::new().await;
    mount_structure(
        &ctx,
        "c-1",
        json!({"Slug": "phone", "Variations": [on_list("phone-black"), {"Slug": "phone-red", "CatalogItems": []}]}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(TestContext::company_path("catalogs", "/Catalog/Items(c-missing)/Structure")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&ctx.server)
        .await;
    mount_slug_details(
        &ctx,
        json!({"phone-black": {"Name": "Phone Black", "VendorSkus": [{"Sku": "V-1", "Entity": {"Id": SUPPLIER_ID}}]}}),
    )
    .await;

    let envelope = ctx
        .run("getProductSimpleById", json!({"remoteIDs": ["c-1", "c-missing"]}))
        .await;

    assert_eq!(envelope.status_code, HubStatus::Ok);
    let products = envelope.payload.as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["Slug"], json!("phone-black"));
    assert_eq!(products[0]["Name"], json!("Phone Black"));
    assert_eq!(products[0]["ncVendorSku"]["Sku"], json!("V-1"));
    assert_eq!(products[0]["ncSubscriptionList"]["listId"], json!(LIST_ID));
}

#[tokio::test]
async fn test_matrix_product_by_id_hydrates_children() {
    let ctx = TestContext::new().await;
    mount_structure(
        &ctx,
        "c-2",
        json!({"Slug": "case", "Variations": [on_list("case-s"), on_list("case-l")]}),
    )
    .await;
    mount_slug_details(
        &ctx,
        json!({
            "case": {"Name": "Case"},
            "case-s": {"Name": "Case S", "VendorSkus": [{"Sku": "V-S", "Entity": {"Id": SUPPLIER_ID}}]},
            "case-l": {"Name": "Case L"}
        }),
    )
    .await;

    let envelope = ctx.run("getProductMatrixById", json!({"remoteIDs": ["c-2"]})).await;

    assert_eq!(envelope.status_code, HubStatus::Ok);
    let product = &envelope.payload[0];
    assert_eq!(product["Name"], json!("Case"));
    assert_eq!(product["ncVendorSku"], Value::Null);
    assert_eq!(product["Variations"][0]["ncVendorSku"]["Sku"], json!("V-S"));
    assert_eq!(product["Variations"][1]["Name"], json!("Case L"));
}

#[tokio::test]
async fn test_simple_products_by_created_range() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path(TestContext::company_path("catalogs", "/Catalog/GroupedSearch")))
        .and(query_param("VendorIds", SUPPLIER_ID.to_string()))
        .and(query_param("CreatedFromUtc", "2024-01-01T00:00:00.000Z"))
        .and(query_param("OrderBy", "dateAdded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [
                {
                    "CatalogItemId": "c-3",
                    "Slug": "charger",
                    "SourceIds": [LIST_ID],
                    "Vendors": [{"Id": SUPPLIER_ID}],
                    "Identifiers": [{"SkuType": "VendorSKU", "Sku": "V-3", "Entity": {"Id": SUPPLIER_ID}}]
                },
                {"CatalogItemId": "c-4", "Slug": "other", "Vendors": [{"Id": 1}]}
            ],
            "MetaData": {"TotalResults": 2}
        })))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path(TestContext::company_path("catalogs", "/Catalog/Items/ByVendorSku")))
        .and(query_param("vendorSku", "V-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [{"CatalogItemId": "c-3", "SourceIds": [LIST_ID], "IsDropshippable": true}]
        })))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::company_path("catalogs", "/Catalog/Items/ProductDetails/Bulk")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "CatalogItems": {"c-3": {"Name": "Charger"}}
        })))
        .mount(&ctx.server)
        .await;

    let envelope = ctx
        .run("getProductSimpleByCreatedTimeRange", january_range("createdDateRange"))
        .await;

    assert_eq!(envelope.status_code, HubStatus::Ok);
    let products = envelope.payload.as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["Name"], json!("Charger"));
    assert_eq!(products[0]["IsDropshippable"], json!(true));
    assert_eq!(products[0]["ncVendorSku"]["Sku"], json!("V-3"));
}

#[tokio::test]
async fn test_quantity_by_id() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/availability/v1/Suppliers({SUPPLIER_ID})/Companies(13149)/BulkSupplierAvailability"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "SupplierAvailabilities": [{"SupplierSku": "V-1", "SupplierEntityId": SUPPLIER_ID, "Quantity": 12}]
        })))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path(TestContext::company_path("catalogs", "/Catalog/Items/ByVendorSku")))
        .and(query_param("vendorSku", "V-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [{"CatalogItemId": "c-1", "SourceIds": [LIST_ID]}]
        })))
        .mount(&ctx.server)
        .await;

    let envelope = ctx.run("getProductQuantityById", json!({"remoteIDs": ["V-1"]})).await;

    assert_eq!(envelope.status_code, HubStatus::Ok);
    assert_eq!(envelope.payload[0]["Quantity"], json!(12));
    assert_eq!(envelope.payload[0]["Items"][0]["CatalogItemId"], json!("c-1"));
}

#[tokio::test]
async fn test_pricing_for_every_listed_product() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path(TestContext::company_path(
            "catalogs",
            &format!("/Catalog/Items(SourceId={LIST_ID})"),
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Items": [{"CatalogItemId": "c-1"}]})))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::company_path("catalogs", "/Catalog/Items/ProductDetails/Bulk")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "CatalogItems": {"c-1": {"VendorSkus": [{"Sku": "V-1", "Entity": {"Id": SUPPLIER_ID}}]}}
        })))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pricing/v1/Companies(13149)/Entities(13150)/CatalogItems(c-1)/Pricing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.server)
        .await;

    let envelope = ctx
        .run("getProductPricingByModifiedTimeRange", january_range("modifiedDateRange"))
        .await;

    assert_eq!(envelope.status_code, HubStatus::Ok);
    assert_eq!(envelope.payload[0]["Pricing"], Value::Null);
    assert_eq!(envelope.payload[0]["VendorSku"]["Sku"], json!("V-1"));
}
