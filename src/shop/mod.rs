// src/shop/mod.rs

//! Customer-facing shop: cart, checkout and orders

pub mod cart;
pub mod checkout;
pub mod models;
pub mod orders;

pub use cart::{compute_totals, CartItem, CartSnapshot, CartStore, CartTotals, Coupon};
pub use checkout::{validate_address, Address, FieldError, PaymentMethod};
pub use models::{Order, OrderItem, OrderStatus, TimelineEntry};
pub use orders::{OrderPlaced, OrderService};
