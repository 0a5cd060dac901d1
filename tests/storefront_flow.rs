// tests/storefront_flow.rs - End-to-end flows against a scripted API

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::NaiveDate;
use serde_json::{json, Value};

use storefront_core::admin::{filter_orders, OrderFilter};
use storefront_core::auth::guards::{self, GuardDecision};
use storefront_core::catalog::{CatalogFilter, SortMode};
use storefront_core::config::{AppConfig, PricingConfig};
use storefront_core::manager::Manager;
use storefront_core::platform::{HttpMethod, MemoryNetwork, MemoryStorage, PlatformProviders};
use storefront_core::shop::{compute_totals, Address, CartItem, Coupon, Order, OrderStatus, PaymentMethod};
use storefront_core::Storefront;

const BASE: &str = "http://localhost:5000/api";

fn token(claims: Value) -> String {
    format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.sig",
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

fn catalog_json() -> Value {
    json!([
        {"id": 1, "title": "Over-ear Headphones", "category": "Audio", "price": 150, "stock": 5},
        {"id": 2, "title": "Earbuds", "category": "Audio", "price": 120, "stock": 3},
        {"id": 3, "title": "Scarf", "category": "Fashion", "price": 130, "stock": 9},
        {"id": 4, "title": "Soundbar", "category": "Audio", "price": 500, "oldPrice": 650, "stock": 5}
    ])
}

fn storefront(network: Arc<MemoryNetwork>, storage: MemoryStorage) -> Storefront {
    Storefront::new(
        AppConfig::default(),
        PlatformProviders::new(network, Arc::new(storage)),
    )
}

fn address() -> Address {
    Address {
        name: "Asha Rao".into(),
        phone: "9876543210".into(),
        line1: "12 MG Road".into(),
        line2: String::new(),
        city: "Pune".into(),
        state: "MH".into(),
        pincode: "411001".into(),
    }
}

#[tokio::test]
async fn shopper_browses_filters_and_checks_out() {
    let network = Arc::new(MemoryNetwork::new(BASE));
    network.respond_json(HttpMethod::Get, "/products", 200, catalog_json());
    network.respond_json(
        HttpMethod::Post,
        "/auth/login",
        200,
        json!({"id": 9, "name": "Asha", "email": "asha@example.com", "role": "user", "token": "t-123"}),
    );
    network.respond_json(
        HttpMethod::Post,
        "/orders",
        201,
        json!({"id": 501, "userId": 9, "items": [{"id": 4, "title": "Soundbar", "qty": 2}],
               "totals": {"total": 1057.0, "coupon": "DEAL10"}, "status": "Created",
               "placedAt": "2024-05-02T08:30:00.000Z"}),
    );
    let app = storefront(network.clone(), MemoryStorage::new());
    app.initialize().await.unwrap();

    assert_eq!(
        guards::check_navigation(app.session().user().as_ref(), "/shop/cart"),
        GuardDecision::Redirect("/auth/login?returnUrl=%2Fshop%2Fcart".into())
    );

    let mut view = app.catalog_view();
    view.set_filter(CatalogFilter {
        category: "Audio".into(),
        min_price: Some(100.0),
        max_price: Some(200.0),
        sort: SortMode::PriceAsc,
        ..Default::default()
    });
    let ids: Vec<i64> = view.filtered().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(view.deals().len(), 1);

    app.session().login("asha@example.com", "secret").await.unwrap();
    let user = app.session().user();
    assert!(guards::check_navigation(user.as_ref(), "/shop/cart").is_allowed());
    assert_eq!(
        guards::check_navigation(user.as_ref(), "/admin/orders"),
        GuardDecision::Redirect("/auth/login?returnUrl=%2Fadmin%2Forders".into())
    );
    assert_eq!(
        guards::check_navigation(user.as_ref(), "/auth/login"),
        GuardDecision::Redirect("/catalog".into())
    );

    let soundbar = app.catalog().products().into_iter().find(|p| p.id == 4).unwrap();
    app.cart().add_product(&soundbar, 2).unwrap();
    assert!(app.cart().apply_coupon(" deal10 "));
    let totals = app.cart().totals();
    assert_eq!(totals.subtotal, 1000.0);
    assert_eq!(totals.shipping, 49.0);
    assert_eq!(totals.total, 1057.0);

    let order = app
        .orders()
        .place_order(&address(), PaymentMethod::Upi)
        .await
        .unwrap();
    assert_eq!(order.id, "501");
    assert_eq!(order.amount, 1057.0);
    assert!(app.cart().is_empty());

    let sent = &network.requests_to(HttpMethod::Post, "/orders")[0];
    assert_eq!(sent.headers["Authorization"], "Bearer t-123");
    let body = sent.json_body().unwrap();
    assert_eq!(body["items"], json!([{"id": 4, "qty": 2}]));
    assert_eq!(body["method"], "upi");
    assert_eq!(body["coupon"], "DEAL10");
}

#[test]
fn free_shipping_threshold_is_inclusive() {
    let cart = vec![CartItem {
        id: 1,
        title: "Lamp".into(),
        price: 500.0,
        image_url: String::new(),
        qty: 2,
        stock: 5,
    }];

    let totals = compute_totals(&cart, None, &PricingConfig::default());
    assert_eq!(totals.shipping, 0.0);
    assert_eq!(totals.total, 1120.0);

    let above_thousand = PricingConfig {
        free_shipping_threshold: 1000.01,
        ..Default::default()
    };
    let totals = compute_totals(&cart, None, &above_thousand);
    assert_eq!(totals.shipping, 49.0);
    assert_eq!(totals.total, 1169.0);

    let totals = compute_totals(&cart, Some(Coupon::Deal10), &above_thousand);
    assert_eq!(totals.total, 1057.0);
}

#[test]
fn order_date_filter_includes_last_millisecond_of_day() {
    let orders: Vec<Order> = serde_json::from_value(json!([
        {"id": 1, "amount": 10, "createdAt": "2024-03-31T23:59:59.999Z"},
        {"id": 2, "amount": 20, "createdAt": "2024-04-01T00:00:00.000Z"}
    ]))
    .unwrap();
    let filter = OrderFilter {
        to: NaiveDate::from_ymd_opt(2024, 3, 31),
        ..Default::default()
    };

    let matched = filter_orders(&orders, &filter);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, "1");
}

#[tokio::test]
async fn admin_status_change_survives_rejected_patch() {
    let network = Arc::new(MemoryNetwork::new(BASE));
    network.respond_json(HttpMethod::Get, "/products", 200, json!([]));
    network.respond_json(
        HttpMethod::Get,
        "/admin/orders",
        200,
        json!([
            {"id": 11, "userName": "Ravi", "amount": 300, "status": "Created",
             "createdAt": "2024-05-01T10:00:00Z",
             "timeline": [{"status": "Created", "at": "2024-05-01T10:00:00Z"}]},
            {"id": 12, "userName": "Meena", "amount": 80, "status": "Delivered",
             "createdAt": "2024-05-02T10:00:00Z"}
        ]),
    );
    network.respond_json(HttpMethod::Patch, "/orders/11", 500, json!({"message": "boom"}));

    let admin = token(json!({"sub": "1", "name": "Admin", "role": "admin", "exp": 4_102_444_800u64}));
    let app = storefront(network.clone(), MemoryStorage::with_entry("token", &admin));
    app.initialize().await.unwrap();
    assert!(guards::check_navigation(app.session().user().as_ref(), "/admin/orders").is_allowed());

    let view = app.admin_orders_view();
    assert_eq!(view.summary().count, 2);
    assert_eq!(view.summary().pending, 1);
    assert!(view.export_csv().starts_with("\"OrderID\",\"UserName\""));

    let ravi = view.filtered().iter().find(|o| o.id == "11").cloned().unwrap();
    let store = app.admin_orders();
    store.open(ravi);

    let accepted = store.set_status("11", OrderStatus::Paid).await;
    assert!(!accepted);

    let selected = store.selected().unwrap();
    assert_eq!(selected.status, OrderStatus::Paid);
    assert_eq!(selected.timeline.len(), 2);
    assert_eq!(selected.timeline[1].status, OrderStatus::Paid);
    assert_eq!(
        store.orders().iter().find(|o| o.id == "11").unwrap().status,
        OrderStatus::Created
    );

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn expired_session_is_discarded_on_startup() {
    let network = Arc::new(MemoryNetwork::new(BASE));
    network.respond_json(HttpMethod::Get, "/products", 200, json!([]));
    let stale = token(json!({"sub": 3, "role": "admin", "exp": 1_000}));
    let storage = Arc::new(MemoryStorage::with_entry("token", &stale));
    let app = Storefront::new(
        AppConfig::default(),
        PlatformProviders::new(network.clone(), storage.clone()),
    );

    app.initialize().await.unwrap();

    assert!(!app.session().is_logged_in());
    assert!(!storage.contains("token"));
    assert!(network.requests_to(HttpMethod::Get, "/admin/orders").is_empty());
    assert_eq!(
        guards::admin_segments(None, &["admin", "products"]),
        GuardDecision::Redirect("/auth/login?returnUrl=%2Fadmin%2Fproducts".into())
    );
}
