// src/shop/orders.rs

//! Customer order submission and history

use std::sync::Arc;

use serde_json::{json, Value};

use crate::api::ApiClient;
use crate::define_event;
use crate::error::{BusinessRule, Error, Result};
use crate::event::EventBus;
use crate::shop::cart::CartStore;
use crate::shop::checkout::{validate_address, Address, PaymentMethod};
use crate::shop::models::Order;

define_event!(OrderPlaced, "shop.order_placed", order_id: String, amount: f64);

pub struct OrderService {
    api: ApiClient,
    cart: Arc<CartStore>,
    event_bus: Option<Arc<EventBus>>,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService").finish_non_exhaustive()
    }
}

impl OrderService {
    pub fn new(api: ApiClient, cart: Arc<CartStore>) -> Self {
        Self {
            api,
            cart,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Request body for the current cart
    pub fn order_body(&self, address: &Address, method: PaymentMethod) -> Value {
        let items: Vec<Value> = self
            .cart
            .items()
            .iter()
            .map(|line| json!({ "id": line.id, "qty": line.qty }))
            .collect();

        let mut body = json!({
            "items": items,
            "address": address,
            "method": method,
        });
        if let Some(coupon) = self.cart.coupon() {
            body["coupon"] = Value::String(coupon.code().to_string());
        }
        body
    }

    /// Submits the cart; it is cleared only once the server accepts the order
    pub async fn place_order(&self, address: &Address, method: PaymentMethod) -> Result<Order> {
        if self.cart.is_empty() {
            return Err(Error::business(BusinessRule::EmptyCart, "Your cart is empty"));
        }
        let errors = validate_address(address);
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let order = self
            .api
            .create_order(self.order_body(address, method))
            .await?;
        tracing::info!(order_id = %order.id, amount = order.amount, "Order placed");

        self.cart.clear();
        if let Some(bus) = &self.event_bus {
            bus.publish(OrderPlaced::new("order_service", order.id.clone(), order.amount));
        }
        Ok(order)
    }

    pub async fn my_orders(&self) -> Result<Vec<Order>> {
        self.api.my_orders().await
    }

    pub async fn cancel(&self, order_id: &str) -> Result<()> {
        self.api.cancel_order(order_id).await?;
        tracing::info!(order_id, "Order cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::error::ErrorKind;
    use crate::platform::{HttpMethod, MemoryNetwork};
    use crate::shop::cart::CartItem;
    use crate::shop::checkout::sample_address;

    const BASE: &str = "http://localhost:5000/api";

    fn service(network: Arc<MemoryNetwork>) -> (OrderService, Arc<CartStore>) {
        let cart = Arc::new(CartStore::default());
        let api = ApiClient::new(network, &ApiConfig::default());
        (OrderService::new(api, cart.clone()), cart)
    }

    fn fill(cart: &CartStore) {
        cart.add(
            CartItem {
                id: 7,
                title: "Mug".into(),
                price: 250.0,
                image_url: String::new(),
                qty: 0,
                stock: 4,
            },
            2,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_place_order_posts_and_clears() {
        let network = Arc::new(MemoryNetwork::new(BASE));
        network.respond_json(
            HttpMethod::Post,
            "/orders",
            201,
            json!({"id": 101, "items": [], "totals": {"total": 609}, "status": "Created",
                   "placedAt": "2024-06-01T12:00:00Z", "method": "card"}),
        );
        let (service, cart) = service(network.clone());
        fill(&cart);
        cart.apply_coupon("freeship");

        let bus = Arc::new(EventBus::new());
        let service = service.with_event_bus(bus.clone());

        let order = service
            .place_order(&sample_address(), PaymentMethod::Card)
            .await
            .unwrap();
        assert_eq!(order.id, "101");
        assert_eq!(order.amount, 609.0);
        assert!(cart.is_empty());
        assert_eq!(bus.stats().events_by_type.get("shop.order_placed"), Some(&1));

        let body = network.requests()[0].json_body().cloned().unwrap();
        assert_eq!(body["items"], json!([{"id": 7, "qty": 2}]));
        assert_eq!(body["coupon"], "FREESHIP");
        assert_eq!(body["method"], "card");
        assert_eq!(body["address"]["pincode"], "411001");
    }

    #[tokio::test]
    async fn test_failed_order_keeps_cart() {
        let network = Arc::new(MemoryNetwork::new(BASE));
        network.respond_json(HttpMethod::Post, "/orders", 409, json!({"message": "Out of stock"}));
        let (service, cart) = service(network);
        fill(&cart);

        let err = service
            .place_order(&sample_address(), PaymentMethod::Upi)
            .await
            .unwrap_err();
        assert_eq!(err.message, "Out of stock");
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_before_sending() {
        let network = Arc::new(MemoryNetwork::new(BASE));
        let (service, cart) = service(network.clone());

        let err = service
            .place_order(&sample_address(), PaymentMethod::Cod)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BusinessRule { .. }));

        fill(&cart);
        let bad = Address {
            phone: "123".into(),
            ..sample_address()
        };
        let err = service.place_order(&bad, PaymentMethod::Cod).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Validation { .. }));
        assert!(network.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_sends_action() {
        let network = Arc::new(MemoryNetwork::new(BASE));
        network.respond_json(HttpMethod::Patch, "/orders/55", 200, json!({"ok": true}));
        let (service, _) = service(network.clone());

        service.cancel("55").await.unwrap();
        let body = network.requests()[0].json_body().cloned().unwrap();
        assert_eq!(body, json!({"action": "cancel"}));
    }
}
