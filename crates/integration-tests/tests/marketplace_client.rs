//! Marketplace client against a mocked backend.

#![allow(clippy::unwrap_used)]

use evmarket_core::{AuctionId, ProductId, Vnd};
use evmarket_integration_tests::{bearer, customer, marketplace_client};
use evmarket_storefront::marketplace::{LoginRequest, MarketplaceError, ProductQuery};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_reads_nested_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({ "email": "buyer@example.com", "password": "hunter22" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Login successful",
            "metadata": { "token": "jwt-abc", "user": { "_id": "u-42" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = marketplace_client(&server);
    let session = client
        .login(&LoginRequest {
            email: "buyer@example.com".to_string(),
            password: "hunter22".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(session.access_token, "jwt-abc");
    assert_eq!(session.user_id.unwrap().as_str(), "u-42");
    assert_eq!(session.email, "buyer@example.com");

    let requests = server.received_requests().await.unwrap();
    assert!(requests.first().unwrap().headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_login_failure_surfaces_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Sai mật khẩu" })),
        )
        .mount(&server)
        .await;

    let err = marketplace_client(&server)
        .login(&LoginRequest {
            email: "buyer@example.com".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), "Sai mật khẩu");
}

#[tokio::test]
async fn test_authenticated_requests_carry_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wallet/balance"))
        .and(header("authorization", bearer().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "balance": 2_500_000 })))
        .expect(1)
        .mount(&server)
        .await;

    let balance = marketplace_client(&server)
        .wallet_balance(&customer())
        .await
        .unwrap();
    assert_eq!(balance, Vnd::new(2_500_000));
}

#[tokio::test]
async fn test_missing_balance_reads_as_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wallet/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .mount(&server)
        .await;

    let balance = marketplace_client(&server)
        .wallet_balance(&customer())
        .await
        .unwrap();
    assert_eq!(balance, Vnd::ZERO);
}

#[tokio::test]
async fn test_guest_search_sends_no_token_and_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product-service/v1/products"))
        .and(query_param("keyword", "VinFast"))
        .and(query_param("currentPage", "1"))
        .and(query_param("pageSize", "12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [
                { "_id": "p1", "productName": "Pin VinFast VF e34", "price": 120_000_000 },
                { "_id": "p2", "battery": [{ "name": "LFP 42kWh" }], "price": 90_000_000 }
            ],
            "pagination": { "totalElements": 14 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = marketplace_client(&server);
    let query = ProductQuery {
        keyword: Some("VinFast".to_string()),
        current_page: 1,
        page_size: 12,
    };

    let page = client.search_products(&query, None).await.unwrap();
    assert_eq!(page.products.len(), 2);
    assert_eq!(page.total(), 14);
    assert_eq!(page.products.get(1).unwrap().display_name(), "Battery LFP 42kWh");

    // Served from cache; the mock expects a single hit.
    let again = client.search_products(&query, None).await.unwrap();
    assert_eq!(again.products.len(), 2);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.first().unwrap().headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Product not found" })),
        )
        .mount(&server)
        .await;

    let err = marketplace_client(&server)
        .product(&ProductId::new("missing"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketplaceError::NotFound(_)));
}

#[tokio::test]
async fn test_refused_bid_keeps_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auctions/a-1/bid"))
        .and(header("authorization", bearer().as_str()))
        .and(body_json(json!({ "amount": 6_100_000 })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": { "amount": "Bid must exceed the current price" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = marketplace_client(&server)
        .place_bid(&customer(), &AuctionId::new("a-1"), Vnd::new(6_100_000))
        .await
        .unwrap_err();

    assert!(!err.is_unauthorized());
    assert_eq!(err.user_message(), "Bid must exceed the current price");
}

#[tokio::test]
async fn test_bid_history_unwraps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auctions/a-1/bids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bids": [
                { "bid_amount": 5_500_000, "user": { "username": "an" } },
                { "bid_amount": 6_000_000, "user": { "username": "binh" }, "is_winner": true }
            ]
        })))
        .mount(&server)
        .await;

    let bids = marketplace_client(&server)
        .bids(&AuctionId::new("a-1"), Some(&customer()))
        .await
        .unwrap();
    assert_eq!(bids.len(), 2);
    assert!(bids.get(1).unwrap().is_winner);
}

#[tokio::test]
async fn test_expired_token_is_reported_as_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wallet/transactions"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let err = marketplace_client(&server)
        .transactions(&customer())
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), "Forbidden");
}
