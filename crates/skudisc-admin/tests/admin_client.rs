//! Integration tests for `AdminClient` against a wiremock Admin API.
//!
//! Each test stands up its own server, so no real network traffic is made.
//! Requests are matched on the GraphQL operation name in the body.

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skudisc_admin::{AdminClient, AdminError, DiscountMetafield};
use skudisc_core::listing::{DiscountKind, DiscountStatus};
use skudisc_core::{EditorSession, LookupOptions, ReconcileError, SessionState};

const GRAPHQL_PATH: &str = "/admin/api/2025-10/graphql.json";
const DISCOUNT_ID: &str = "gid://shopify/DiscountAutomaticNode/77";

fn test_client(server: &MockServer) -> AdminClient {
    AdminClient::with_base_url("test-token", 5, "skudisc-test/0.1", &server.uri(), "2025-10")
        .expect("failed to build test AdminClient")
}

fn products_body() -> serde_json::Value {
    json!({
        "data": {
            "products": {
                "nodes": [{
                    "id": "gid://shopify/Product/1",
                    "title": "Jersey Frame",
                    "featuredImage": { "url": "https://cdn.shopify.com/frame.jpg" },
                    "variants": {
                        "nodes": [
                            { "id": "gid://shopify/ProductVariant/11", "sku": "FRM-JERS-1", "price": "100.00", "displayName": "Jersey Frame - Black" },
                            { "id": "gid://shopify/ProductVariant/12", "sku": "FRM-JERS-10", "price": "120.00", "displayName": "Jersey Frame - Oak" }
                        ]
                    }
                }]
            }
        }
    })
}

// ---------------------------------------------------------------------------
// SKU search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_sends_token_and_or_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(header("X-Shopify-Access-Token", "test-token"))
        .and(body_string_contains("SearchProductsBySku"))
        .and(body_string_contains(r#"sku:\"FRM-JERS-1\" OR sku:\"FRM-MISSING\""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let products = client
        .search_products_by_sku(&["FRM-JERS-1".to_owned(), "FRM-MISSING".to_owned()])
        .await
        .expect("search should succeed");

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].title, "Jersey Frame");
    assert_eq!(products[0].image.as_deref(), Some("https://cdn.shopify.com/frame.jpg"));
    assert_eq!(products[0].variants.len(), 1, "prefix match FRM-JERS-10 must be dropped");
    assert_eq!(products[0].variants[0].price.as_deref(), Some("100.00"));
}

#[tokio::test]
async fn top_level_graphql_errors_are_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "message": "Field 'skus' doesn't exist on type 'Product'" }]
        })))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .search_products_by_sku(&["A".to_owned()])
        .await
        .unwrap_err();
    assert!(
        matches!(err, AdminError::GraphQl { ref messages, .. } if messages.len() == 1),
        "expected GraphQl error, got: {err:?}"
    );
}

#[tokio::test]
async fn throttled_response_is_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "message": "Throttled", "extensions": { "code": "THROTTLED" } }]
        })))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .search_products_by_sku(&["A".to_owned()])
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::RateLimited { .. }), "got: {err:?}");
}

#[tokio::test]
async fn http_429_reads_retry_after_and_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server)
        .search_products_by_sku(&["A".to_owned()])
        .await
        .unwrap_err();
    assert!(
        matches!(err, AdminError::RateLimited { retry_after_secs: 7 }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn unauthorized_is_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .search_products_by_sku(&["A".to_owned()])
        .await
        .unwrap_err();
    assert!(
        matches!(err, AdminError::UnexpectedStatus { status: 401, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn malformed_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .search_products_by_sku(&["A".to_owned()])
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::Deserialize { .. }), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// Bulk import through the session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bulk_import_resolves_through_admin_api() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("SearchProductsBySku"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_body()))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let (mut session, _) = EditorSession::hydrate(None, "SUMMERFRAMING");
    let result = session
        .bulk_import("FRM-JERS-1, 35\nFRM-MISSING, 10", &client, LookupOptions::default())
        .await
        .expect("import should succeed");

    assert_eq!(result.added_count, 1);
    assert_eq!(
        result.not_found_skus.into_iter().collect::<Vec<_>>(),
        vec!["FRM-MISSING".to_owned()]
    );
    assert_eq!(session.state(), SessionState::Dirty);
    let record = session
        .configuration()
        .get("gid://shopify/ProductVariant/11")
        .expect("record keyed by variant id");
    assert_eq!(record.final_price().map(|p| p.to_string()), Some("65.00".to_owned()));
}

#[tokio::test]
async fn failed_lookup_is_catalog_lookup_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let (mut session, _) = EditorSession::hydrate(None, "SUMMERFRAMING");
    let err = session
        .bulk_import("FRM-JERS-1, 35", &client, LookupOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::CatalogLookupFailed { .. }), "got: {err:?}");
    assert!(session.configuration().is_empty());
    assert_eq!(session.state(), SessionState::Clean);
}

// ---------------------------------------------------------------------------
// Metafield store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_loads_legacy_metafield() {
    let server = MockServer::start().await;
    let stored = r#"{"discount_code":"SUMMERFRAMING","sku_discounts":{"FRM-JERS-1":35.0}}"#;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("DiscountMetafield"))
        .and(body_string_contains("function-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "discountNode": { "metafield": { "value": stored } } }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let store = DiscountMetafield::new(&client, DISCOUNT_ID, "$app:sku-custom-discount", "function-configuration");
    let (session, err) = EditorSession::load(&store, "FALLBACK")
        .await
        .expect("load should succeed");

    assert!(err.is_none(), "unexpected load error: {err:?}");
    assert_eq!(session.configuration().discount_code, "SUMMERFRAMING");
    assert_eq!(session.configuration().unresolved_skus(), vec!["FRM-JERS-1".to_owned()]);
}

#[tokio::test]
async fn unreachable_metafield_fails_load_without_writing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("DiscountMetafield"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("metafieldsSet"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let store = DiscountMetafield::new(&client, DISCOUNT_ID, "$app:sku-custom-discount", "function-configuration");
    let result = EditorSession::load(&store, "FALLBACK").await;

    assert!(matches!(result, Err(ReconcileError::LoadFailed { .. })));
}

#[tokio::test]
async fn missing_metafield_reads_as_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "discountNode": { "metafield": null } }
        })))
        .mount(&server)
        .await;

    let value = test_client(&server)
        .read_metafield(DISCOUNT_ID, "$app:sku-custom-discount", "function-configuration")
        .await
        .expect("read should succeed");
    assert!(value.is_none());
}

#[tokio::test]
async fn save_writes_json_metafield_and_cleans_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("metafieldsSet"))
        .and(body_string_contains(DISCOUNT_ID))
        .and(body_string_contains(r#""type":"json""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "metafieldsSet": { "metafields": [{ "id": "gid://shopify/Metafield/1" }], "userErrors": [] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let store = DiscountMetafield::new(&client, DISCOUNT_ID, "$app:sku-custom-discount", "function-configuration");
    let (mut session, _) = EditorSession::hydrate(
        Some(r#"{"discount_code":"D","sku_discounts":{"SKU1":10}}"#),
        "D",
    );
    session.set_value("SKU1", 20.0).expect("record exists");
    session.save(&store).await.expect("save should succeed");

    assert_eq!(session.state(), SessionState::Clean);
}

#[tokio::test]
async fn rejected_metafield_write_keeps_session_dirty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("metafieldsSet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "metafieldsSet": {
                "metafields": [],
                "userErrors": [{ "field": ["metafields", "0", "namespace"], "message": "Access denied" }]
            } }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let store = DiscountMetafield::new(&client, DISCOUNT_ID, "$app:sku-custom-discount", "function-configuration");
    let (mut session, _) = EditorSession::hydrate(
        Some(r#"{"discount_code":"D","sku_discounts":{"SKU1":10}}"#),
        "D",
    );
    session.set_value("SKU1", 20.0).expect("record exists");
    let err = session.save(&store).await.unwrap_err();

    assert!(matches!(err, ReconcileError::PersistFailed { .. }), "got: {err:?}");
    assert!(err.to_string().contains("metafields.0.namespace: Access denied"));
    assert_eq!(session.state(), SessionState::Dirty);
}

#[tokio::test]
async fn existing_definition_is_not_recreated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("FindMetafieldDefinition"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "metafieldDefinitions": { "nodes": [{ "id": "gid://shopify/MetafieldDefinition/5" }] } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("CreateMetafieldDefinition"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let created = test_client(&server)
        .ensure_metafield_definition("$app:sku-custom-discount", "function-configuration")
        .await
        .expect("lookup should succeed");
    assert!(!created);
}

// ---------------------------------------------------------------------------
// Discounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_discounts_keeps_app_discounts_only() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("AppDiscounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "discountNodes": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [
                {
                    "id": DISCOUNT_ID,
                    "discount": {
                        "__typename": "DiscountAutomaticApp",
                        "title": "Summer framing",
                        "status": "ACTIVE",
                        "startsAt": "2025-06-01T00:00:00Z",
                        "endsAt": null,
                        "createdAt": "2025-05-20T09:30:00Z",
                        "asyncUsageCount": 12,
                        "appDiscountType": { "functionId": "fn-1" }
                    }
                },
                {
                    "id": "gid://shopify/DiscountCodeNode/3",
                    "discount": { "__typename": "DiscountCodeBasic" }
                }
            ] } }
        })))
        .mount(&server)
        .await;

    let discounts = test_client(&server)
        .list_discounts()
        .await
        .expect("listing should succeed");

    assert_eq!(discounts.len(), 1);
    assert_eq!(discounts[0].discount_id, DISCOUNT_ID);
    assert_eq!(discounts[0].status, DiscountStatus::Active);
    assert_eq!(discounts[0].kind, DiscountKind::AutomaticApp);
    assert_eq!(discounts[0].async_usage_count, 12);
}

fn app_discount_node(id: u32, title: &str) -> serde_json::Value {
    json!({
        "id": format!("gid://shopify/DiscountAutomaticNode/{id}"),
        "discount": {
            "__typename": "DiscountAutomaticApp",
            "title": title,
            "status": "ACTIVE",
            "startsAt": null,
            "endsAt": null,
            "createdAt": "2025-05-20T09:30:00Z",
            "asyncUsageCount": 0,
            "appDiscountType": { "functionId": "fn-1" }
        }
    })
}

#[tokio::test]
async fn list_discounts_follows_page_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("AppDiscounts"))
        .and(body_string_contains(r#""after":null"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "discountNodes": {
                "pageInfo": { "hasNextPage": true, "endCursor": "cursor-1" },
                "nodes": [app_discount_node(1, "Summer framing")]
            } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("AppDiscounts"))
        .and(body_string_contains(r#""after":"cursor-1""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "discountNodes": {
                "pageInfo": { "hasNextPage": false, "endCursor": "cursor-2" },
                "nodes": [app_discount_node(2, "Winter canvas")]
            } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let discounts = test_client(&server)
        .list_discounts()
        .await
        .expect("listing should succeed");

    let titles: Vec<&str> = discounts.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["Summer framing", "Winter canvas"]);
}

#[tokio::test]
async fn deactivate_uses_automatic_mutation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("discountAutomaticDeactivate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "payload": { "userErrors": [] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server)
        .set_discount_active(DISCOUNT_ID, DiscountKind::AutomaticApp, false)
        .await
        .expect("deactivate should succeed");
}
