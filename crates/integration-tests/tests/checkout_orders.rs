//! Placing orders from a cart against a mocked backend.

#![allow(clippy::unwrap_used)]

use evmarket_core::{CartItem, PaymentMethod, ProductId, Quantity, ShopId, VariantId, Vnd};
use evmarket_integration_tests::{bearer, customer, marketplace_client};
use evmarket_storefront::cart::{CartStore, MemoryCartStorage};
use evmarket_storefront::services::checkout::{
    LineKey, Selection, VoucherCode, build_orders, remaining_after_order, submit_orders,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn item(id: &str, price: i64) -> CartItem {
    CartItem {
        id: ProductId::new(id),
        name: format!("Pin {id}"),
        price: Vnd::new(price),
        image: String::new(),
        quantity: Quantity::new(1),
        variant_id: VariantId::new(id),
        shop_id: ShopId::new("shop-1"),
    }
}

#[tokio::test]
async fn test_orders_stop_at_first_refusal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("authorization", bearer().as_str()))
        .and(body_partial_json(json!({ "product": "A", "voucher": "SALE10" })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "order": { "_id": "ord-1" } })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_partial_json(json!({ "product": "B" })))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "Product already sold" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_partial_json(json!({ "product": "C" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let items = vec![item("A", 100), item("B", 200), item("C", 300)];
    let voucher = VoucherCode::parse(" sale10 ").unwrap();
    let orders = build_orders(
        &items,
        &Selection::all(&items),
        Some(&voucher),
        PaymentMethod::Cod,
    )
    .unwrap();

    let outcome = submit_orders(&marketplace_client(&server), &customer(), orders).await;

    assert_eq!(outcome.placed.len(), 1);
    let (key, receipt) = outcome.placed.first().unwrap();
    assert_eq!(key.id.as_str(), "A");
    assert_eq!(receipt.id.as_deref(), Some("ord-1"));
    assert_eq!(
        outcome.failure.unwrap().user_message(),
        "Product already sold"
    );

    let purchased: Vec<LineKey> = outcome.placed.iter().map(|(k, _)| k.clone()).collect();
    let remaining = remaining_after_order(&items, &purchased);
    let ids: Vec<&str> = remaining.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["B", "C"]);
}

#[tokio::test]
async fn test_unselected_lines_stay_in_cart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "orderId": "ord-9" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = CartStore::new(None);
    let storage = MemoryCartStorage::new("visitor-1");
    store.add(&storage, item("A", 100)).await.unwrap();
    store.add(&storage, item("B", 200)).await.unwrap();

    let items = store.load(&storage).await;
    let mut selection = Selection::all(&items);
    selection.toggle(items.get(1).unwrap());

    let orders = build_orders(&items, &selection, None, PaymentMethod::Online).unwrap();
    let outcome = submit_orders(&marketplace_client(&server), &customer(), orders).await;
    assert!(outcome.failure.is_none());

    let purchased: Vec<LineKey> = outcome.placed.iter().map(|(k, _)| k.clone()).collect();
    store
        .replace(&storage, remaining_after_order(&items, &purchased))
        .await
        .unwrap();

    let left = store.load(&storage).await;
    assert_eq!(left.len(), 1);
    assert_eq!(left.first().unwrap().id.as_str(), "B");
}
