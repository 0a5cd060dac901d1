// src/shop/cart.rs

//! Shopping cart and its pricing
//!
//! Totals are never stored. [`compute_totals`] derives them from the lines and
//! the coupon every time they are read or published.

use std::fmt;

use futures::channel::mpsc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::catalog::models::Product;
use crate::config::PricingConfig;
use crate::error::{BusinessRule, Error, Result};
use crate::event::Subject;
use crate::types::ProductId;
use crate::utils::round2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ProductId,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub image_url: String,
    pub qty: u32,
    /// Stock when the line was added; caps `qty`
    pub stock: u32,
}

impl CartItem {
    /// A line for `product` with no quantity yet
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            qty: 0,
            stock: product.stock,
        }
    }

    pub fn line_total(&self) -> f64 {
        self.price * self.qty as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coupon {
    #[serde(rename = "DEAL10")]
    Deal10,
    #[serde(rename = "FREESHIP")]
    FreeShip,
}

impl Coupon {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Deal10 => "DEAL10",
            Self::FreeShip => "FREESHIP",
        }
    }

    /// Matches a code after trimming and upper-casing it
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "DEAL10" => Some(Self::Deal10),
            "FREESHIP" => Some(Self::FreeShip),
            _ => None,
        }
    }
}

impl fmt::Display for Coupon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: f64,
    pub discount: f64,
    pub shipping: f64,
    pub tax: f64,
    pub total: f64,
    pub coupon: Option<Coupon>,
}

pub fn compute_totals(items: &[CartItem], coupon: Option<Coupon>, pricing: &PricingConfig) -> CartTotals {
    let subtotal: f64 = items.iter().map(CartItem::line_total).sum();
    let discount = match coupon {
        Some(Coupon::Deal10) => subtotal * pricing.deal_discount_rate,
        _ => 0.0,
    };
    let after_discount = (subtotal - discount).max(0.0);
    let free_shipping = items.is_empty()
        || coupon == Some(Coupon::FreeShip)
        || after_discount >= pricing.free_shipping_threshold;
    let shipping = if free_shipping { 0.0 } else { pricing.flat_shipping };
    let tax = after_discount * pricing.tax_rate;

    CartTotals {
        subtotal,
        discount,
        shipping,
        tax,
        total: round2(after_discount + shipping + tax),
        coupon,
    }
}

/// Lines, coupon and the totals derived from them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub coupon: Option<Coupon>,
    pub totals: CartTotals,
}

#[derive(Debug, Clone, Default)]
struct CartState {
    items: Vec<CartItem>,
    coupon: Option<Coupon>,
}

/// In-memory cart. Nothing here is persisted.
#[derive(Debug)]
pub struct CartStore {
    pricing: PricingConfig,
    state: RwLock<CartState>,
    snapshots: Subject<CartSnapshot>,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

impl CartStore {
    pub fn new(pricing: PricingConfig) -> Self {
        let snapshots = Subject::new(CartSnapshot {
            items: Vec::new(),
            coupon: None,
            totals: compute_totals(&[], None, &pricing),
        });
        Self {
            pricing,
            state: RwLock::new(CartState::default()),
            snapshots,
        }
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut CartState) -> R) -> R {
        let mut state = self.state.write();
        let result = f(&mut state);
        // Published under the write guard so snapshots arrive in mutation order.
        self.snapshots.set(CartSnapshot {
            items: state.items.clone(),
            coupon: state.coupon,
            totals: compute_totals(&state.items, state.coupon, &self.pricing),
        });
        result
    }

    /// Adds `qty` of `item` (its own `qty` is ignored). New lines go to the
    /// front and quantities are capped at stock.
    ///
    /// Fails with [`BusinessRule::OutOfStock`] when the item has no stock.
    pub fn add(&self, item: CartItem, qty: u32) -> Result<()> {
        if item.stock == 0 {
            tracing::debug!(product_id = item.id, "Rejecting out-of-stock item");
            return Err(Error::business(
                BusinessRule::OutOfStock,
                format!("{} is out of stock", item.title),
            ));
        }
        let qty = qty.max(1);
        self.mutate(|state| {
            match state.items.iter_mut().find(|line| line.id == item.id) {
                Some(line) => line.qty = line.qty.saturating_add(qty).min(line.stock),
                None => {
                    let qty = qty.min(item.stock);
                    state.items.insert(0, CartItem { qty, ..item });
                }
            }
        });
        Ok(())
    }

    pub fn add_product(&self, product: &Product, qty: u32) -> Result<()> {
        self.add(CartItem::from_product(product), qty)
    }

    pub fn remove(&self, id: ProductId) {
        self.mutate(|state| state.items.retain(|line| line.id != id));
    }

    /// Clamps into `1..=stock`; unknown ids are ignored
    pub fn set_qty(&self, id: ProductId, qty: u32) {
        self.mutate(|state| {
            if let Some(line) = state.items.iter_mut().find(|line| line.id == id) {
                line.qty = qty.min(line.stock).max(1);
            }
        });
    }

    /// Empty code clears the coupon. Unknown codes leave state untouched.
    pub fn apply_coupon(&self, code: &str) -> bool {
        if code.trim().is_empty() {
            self.mutate(|state| state.coupon = None);
            return true;
        }
        match Coupon::parse(code) {
            Some(coupon) => {
                tracing::debug!(%coupon, "Coupon applied");
                self.mutate(|state| state.coupon = Some(coupon));
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        self.mutate(|state| {
            state.items.clear();
            state.coupon = None;
        });
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.state.read().items.clone()
    }

    pub fn coupon(&self) -> Option<Coupon> {
        self.state.read().coupon
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().items.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.state.read().items.iter().map(|l| l.qty).sum()
    }

    pub fn totals(&self) -> CartTotals {
        let state = self.state.read();
        compute_totals(&state.items, state.coupon, &self.pricing)
    }

    pub fn snapshot(&self) -> CartSnapshot {
        self.snapshots.get()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<CartSnapshot> {
        self.snapshots.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn item(id: ProductId, price: f64, stock: u32) -> CartItem {
        CartItem {
            id,
            title: format!("Item {}", id),
            price,
            image_url: String::new(),
            qty: 0,
            stock,
        }
    }

    #[test]
    fn test_totals_below_threshold() {
        let cart = CartStore::default();
        cart.add(item(1, 500.0, 5), 1).unwrap();
        cart.add(item(2, 300.0, 5), 2).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.subtotal, 1100.0);
        assert_eq!(totals.shipping, 0.0);
        assert_eq!(totals.total, 1232.0);

        cart.set_qty(2, 1);
        let totals = cart.totals();
        assert_eq!(totals.subtotal, 800.0);
        assert_eq!(totals.shipping, 49.0);
        assert!((totals.tax - 96.0).abs() < 1e-9);
        assert_eq!(totals.total, 945.0);
    }

    #[test]
    fn test_coupons() {
        let cart = CartStore::default();
        cart.add(item(1, 1000.0, 5), 1).unwrap();

        assert!(cart.apply_coupon("  deal10 "));
        let totals = cart.totals();
        assert!((totals.discount - 100.0).abs() < 1e-9);
        assert_eq!(totals.shipping, 49.0);
        assert_eq!(totals.total, 1057.0);

        assert!(!cart.apply_coupon("BOGUS"));
        assert_eq!(cart.coupon(), Some(Coupon::Deal10));

        assert!(cart.apply_coupon("freeship"));
        assert_eq!(cart.totals().shipping, 0.0);

        assert!(cart.apply_coupon(""));
        assert_eq!(cart.coupon(), None);
    }

    #[test]
    fn test_threshold_is_inclusive_and_configurable() {
        let lines = vec![CartItem {
            qty: 2,
            ..item(1, 500.0, 5)
        }];
        let totals = compute_totals(&lines, None, &PricingConfig::default());
        assert_eq!(totals.shipping, 0.0);
        assert_eq!(totals.total, 1120.0);

        let stricter = PricingConfig {
            free_shipping_threshold: 1000.01,
            ..Default::default()
        };
        let totals = compute_totals(&lines, None, &stricter);
        assert_eq!(totals.shipping, 49.0);
        assert_eq!(totals.total, 1169.0);
    }

    #[test]
    fn test_empty_cart_ships_free() {
        let totals = compute_totals(&[], None, &PricingConfig::default());
        assert_eq!(totals.total, 0.0);
        assert_eq!(totals.shipping, 0.0);
    }

    #[test]
    fn test_add_caps_at_stock_and_prepends() {
        let cart = CartStore::default();
        let err = cart.add(item(9, 10.0, 0), 1).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::BusinessRule {
                rule: BusinessRule::OutOfStock
            }
        ));
        assert!(cart.is_empty());

        cart.add(item(1, 10.0, 3), 2).unwrap();
        cart.add(item(2, 10.0, 3), 5).unwrap();
        cart.add(item(1, 10.0, 3), 4).unwrap();

        let items = cart.items();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(items[0].qty, 3);
        assert_eq!(items[1].qty, 3);

        cart.set_qty(1, 0);
        assert_eq!(cart.items()[1].qty, 1);
        cart.set_qty(42, 2);
        cart.remove(42);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn test_add_saturates_at_stock() {
        let cart = CartStore::default();
        cart.add(item(1, 10.0, 3), 2).unwrap();
        cart.add(item(1, 10.0, 3), u32::MAX).unwrap();
        assert_eq!(cart.items()[0].qty, 3);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_last_snapshot_matches_state_under_contention() {
        use std::sync::Arc;

        let cart = Arc::new(CartStore::default());
        let mut snapshots = cart.subscribe();
        let handles: Vec<_> = (1..=8i64)
            .map(|id| {
                let cart = cart.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        cart.add(item(id, 1.0, 1000), 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut last = None;
        while let Ok(Some(snapshot)) = snapshots.try_next() {
            last = Some(snapshot);
        }
        let last = last.unwrap();
        assert_eq!(last.items, cart.items());
        assert_eq!(last.totals.subtotal, 200.0);
    }

    #[test]
    fn test_clear_drops_coupon() {
        let cart = CartStore::default();
        cart.add(item(1, 10.0, 3), 1).unwrap();
        cart.apply_coupon("DEAL10");
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.coupon(), None);
    }

    #[tokio::test]
    async fn test_subscribers_receive_totals() {
        use futures::StreamExt;

        let cart = CartStore::default();
        let mut snapshots = cart.subscribe();
        assert_eq!(snapshots.next().await.unwrap().totals.total, 0.0);

        cart.add(item(1, 1000.0, 2), 1).unwrap();
        let snapshot = snapshots.next().await.unwrap();
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.totals.total, 1120.0);
    }
}
