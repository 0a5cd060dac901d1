// src/shop/models.rs

//! Order model shared by the shop and the admin console
//!
//! The API returns orders in two shapes. Shop endpoints send `totals`,
//! `placedAt`, a flat `method` and an address with `pincode`; the admin
//! listing sends `amount`, `createdAt`, `timeline`, `payment` and `zip`.
//! Both deserialize into the one normalized [`Order`].

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, UserId};
use crate::utils::Time;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Created,
    Paid,
    Dispatched,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        Self::Created,
        Self::Paid,
        Self::Dispatched,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Paid => "Paid",
            Self::Dispatched => "Dispatched",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Still waiting on fulfilment
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Created | Self::Paid | Self::Dispatched)
    }

    /// Position on the Created → Delivered track; cancelled orders are off it
    pub fn progress_index(&self) -> Option<usize> {
        match self {
            Self::Created => Some(0),
            Self::Paid => Some(1),
            Self::Dispatched => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown order status '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub qty: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderAddress {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

/// Serializes back to the admin listing shape so a round trip is lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireOrder", into = "WireOrder")]
pub struct Order {
    pub id: String,
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub email: Option<String>,
    pub items: Vec<OrderItem>,
    pub amount: f64,
    pub status: OrderStatus,
    pub placed_at: Option<DateTime<Utc>>,
    /// Timestamp text exactly as the server sent it
    pub placed_at_raw: Option<String>,
    pub timeline: Vec<TimelineEntry>,
    pub address: OrderAddress,
    pub payment_method: Option<String>,
    pub txn_id: Option<String>,
    pub coupon: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Order {
    /// Milliseconds used for ordering and date filters, 0 without a timestamp
    pub fn timestamp_millis(&self) -> i64 {
        self.placed_at.map(|t| t.timestamp_millis()).unwrap_or(0)
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.qty).sum()
    }

    pub fn address_line(&self) -> String {
        let parts: Vec<&str> = [&self.address.line1, &self.address.line2]
            .into_iter()
            .filter_map(non_empty)
            .collect();
        if parts.is_empty() {
            "—".to_string()
        } else {
            parts.join(" ")
        }
    }

    pub fn city_state_zip(&self) -> String {
        let left: Vec<&str> = [&self.address.city, &self.address.state]
            .into_iter()
            .filter_map(non_empty)
            .collect();
        let left = left.join(", ");
        let parts: Vec<&str> = [Some(left.as_str()), non_empty(&self.address.zip)]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            "—".to_string()
        } else {
            parts.join(" ")
        }
    }

    pub fn phone(&self) -> &str {
        non_empty(&self.address.phone).unwrap_or("—")
    }

    pub fn payment_label(&self) -> String {
        match non_empty(&self.payment_method) {
            None => "—".to_string(),
            Some(method) => match method.to_ascii_uppercase().as_str() {
                "CARD" => "Card".to_string(),
                "UPI" => "UPI".to_string(),
                "COD" => "COD".to_string(),
                _ => method.to_string(),
            },
        }
    }

    /// Moves to `status` and appends the matching timeline entry
    pub fn apply_status(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        self.status = status;
        self.timeline.push(TimelineEntry { status, at });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(i64),
    Text(String),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireTotals {
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    coupon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePayment {
    method: Option<String>,
    txn_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireAddress {
    name: Option<String>,
    phone: Option<String>,
    line1: Option<String>,
    line2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pincode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireTimelineEntry {
    status: OrderStatus,
    at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOrder {
    id: WireId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default)]
    items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    totals: Option<WireTotals>,
    #[serde(default)]
    status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    placed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeline: Option<Vec<WireTimelineEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<WireAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payment: Option<WirePayment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<String>,
}

impl From<Order> for WireOrder {
    fn from(order: Order) -> Self {
        let timeline = order
            .timeline
            .into_iter()
            .map(|entry| WireTimelineEntry {
                status: entry.status,
                at: entry.at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            })
            .collect();

        Self {
            id: WireId::Text(order.id),
            user_id: order.user_id,
            user_name: Some(order.customer_name),
            email: order.email,
            items: order.items,
            amount: Some(order.amount),
            totals: order.coupon.map(|coupon| WireTotals {
                total: None,
                coupon: Some(coupon),
            }),
            status: order.status,
            created_at: order.placed_at_raw,
            placed_at: None,
            timeline: Some(timeline),
            address: Some(WireAddress {
                name: order.address.name,
                phone: order.address.phone,
                line1: order.address.line1,
                line2: order.address.line2,
                city: order.address.city,
                state: order.address.state,
                zip: order.address.zip,
                pincode: None,
            }),
            payment: Some(WirePayment {
                method: order.payment_method,
                txn_id: order.txn_id,
            }),
            method: None,
        }
    }
}

impl From<WireOrder> for Order {
    fn from(wire: WireOrder) -> Self {
        let totals = wire.totals.unwrap_or_default();
        let address = wire.address.unwrap_or_default();
        let payment = wire.payment.unwrap_or_default();

        let placed_at_raw = wire
            .created_at
            .filter(|s| !s.is_empty())
            .or(wire.placed_at.filter(|s| !s.is_empty()));
        let placed_at = placed_at_raw.as_deref().and_then(Time::parse);

        let customer_name = non_empty(&wire.user_name)
            .or(non_empty(&address.name))
            .unwrap_or("Guest")
            .to_string();

        let timeline = wire
            .timeline
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                Time::parse(&entry.at).map(|at| TimelineEntry {
                    status: entry.status,
                    at,
                })
            })
            .collect();

        Self {
            id: wire.id.into_string(),
            user_id: wire.user_id,
            customer_name,
            email: wire.email.filter(|e| !e.is_empty()),
            items: wire.items,
            amount: wire.amount.or(totals.total).unwrap_or(0.0),
            status: wire.status,
            placed_at,
            placed_at_raw,
            timeline,
            address: OrderAddress {
                name: address.name,
                phone: address.phone,
                line1: address.line1,
                line2: address.line2,
                city: address.city,
                state: address.state,
                zip: address.zip.or(address.pincode),
            },
            payment_method: payment.method.or(wire.method),
            txn_id: payment.txn_id,
            coupon: totals.coupon.filter(|c| !c.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shop_shape() {
        let order: Order = serde_json::from_value(json!({
            "id": 42,
            "userId": 3,
            "items": [{"id": 1, "title": "Mug", "price": 10.0, "qty": 2}],
            "totals": {"subtotal": 20, "total": 71.4, "coupon": "FREESHIP"},
            "status": "Paid",
            "placedAt": "2024-05-01T10:00:00Z",
            "method": "upi",
            "address": {"name": "Asha", "phone": "9876543210", "line1": "1 Main",
                        "city": "Pune", "state": "MH", "pincode": "411001"}
        }))
        .unwrap();

        assert_eq!(order.id, "42");
        assert_eq!(order.amount, 71.4);
        assert_eq!(order.customer_name, "Asha");
        assert_eq!(order.address.zip.as_deref(), Some("411001"));
        assert_eq!(order.payment_label(), "UPI");
        assert_eq!(order.coupon.as_deref(), Some("FREESHIP"));
        assert_eq!(order.city_state_zip(), "Pune, MH 411001");
        assert_eq!(order.item_count(), 2);
        assert!(order.placed_at.is_some());
    }

    #[test]
    fn test_admin_shape() {
        let order: Order = serde_json::from_value(json!({
            "id": "ord_9",
            "userName": "Ravi",
            "email": "ravi@example.com",
            "items": [],
            "amount": 500,
            "status": "Dispatched",
            "createdAt": "2024-05-02T08:30:00.000Z",
            "timeline": [{"status": "Created", "at": "2024-05-02T08:30:00.000Z"}],
            "address": {"zip": "560001"},
            "payment": {"method": "CARD", "txnId": "tx1"}
        }))
        .unwrap();

        assert_eq!(order.id, "ord_9");
        assert_eq!(order.customer_name, "Ravi");
        assert_eq!(order.timeline.len(), 1);
        assert_eq!(order.payment_label(), "Card");
        assert_eq!(order.txn_id.as_deref(), Some("tx1"));
        assert_eq!(order.address_line(), "—");
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let order: Order = serde_json::from_value(json!({"id": 1, "status": "Cancelled"})).unwrap();
        assert_eq!(order.amount, 0.0);
        assert_eq!(order.customer_name, "Guest");
        assert_eq!(order.timestamp_millis(), 0);
        assert_eq!(order.payment_label(), "—");
        assert_eq!(order.status.progress_index(), None);
    }

    #[test]
    fn test_serialize_round_trip_keeps_normalized_fields() {
        let mut order: Order = serde_json::from_value(json!({
            "id": 42,
            "userId": 3,
            "userName": "Ravi",
            "items": [{"id": 1, "title": "Mug", "price": 10.0, "qty": 2}],
            "totals": {"total": 71.4, "coupon": "DEAL10"},
            "status": "Paid",
            "placedAt": "2024-05-01T10:00:00.250Z",
            "method": "upi",
            "address": {"line1": "1 Main", "pincode": "411001"}
        }))
        .unwrap();
        order.apply_status(OrderStatus::Dispatched, Time::parse("2024-05-02T09:15:00Z").unwrap());

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["userName"], "Ravi");
        assert_eq!(json["userId"], 3);
        assert_eq!(json["createdAt"], "2024-05-01T10:00:00.250Z");

        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
        assert_eq!(back.customer_name, "Ravi");
        assert_eq!(back.user_id, Some(3));
        assert_eq!(back.placed_at, order.placed_at);
        assert_eq!(back.timeline.len(), 1);
        assert_eq!(back.coupon.as_deref(), Some("DEAL10"));
        assert_eq!(back.address.zip.as_deref(), Some("411001"));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("paid".parse::<OrderStatus>().unwrap(), OrderStatus::Paid);
        assert!("lost".parse::<OrderStatus>().is_err());
        assert_eq!(OrderStatus::Delivered.progress_index(), Some(3));
        assert!(OrderStatus::Dispatched.is_pending());
        assert!(!OrderStatus::Delivered.is_pending());
    }
}
