// src/admin/orders.rs

//! Admin order console
//!
//! [`filter_orders`], [`summarize`] and [`export_csv`] are pure functions over
//! a list snapshot. [`AdminOrdersView`] holds the form state and pagination;
//! [`AdminOrdersStore`] owns the fetched list and the open detail view.

use std::ops::Range;
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::channel::mpsc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::config::OrdersConfig;
use crate::error::Result;
use crate::event::Subject;
use crate::manager::{ManagedState, Manager, ManagerState, ManagerStatus};
use crate::shop::models::{Order, OrderStatus};
use crate::utils::{Debouncer, Time};

pub const CSV_HEADER: [&str; 7] = [
    "OrderID", "UserName", "Email", "Amount", "Status", "CreatedAt", "Items",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilter {
    /// Matched against id, customer name and email
    pub q: String,
    /// `None` means all statuses
    pub status: Option<OrderStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl OrderFilter {
    /// Inclusive millisecond bounds; `to` covers its whole day
    pub fn date_bounds(&self) -> (i64, i64) {
        let from = self
            .from
            .map(|d| Time::start_of_day(d).timestamp_millis())
            .unwrap_or(i64::MIN);
        let to = self
            .to
            .map(|d| Time::end_of_day(d).timestamp_millis())
            .unwrap_or(i64::MAX);
        (from, to)
    }

    pub fn matches(&self, order: &Order) -> bool {
        let q = self.q.trim().to_lowercase();
        let matches_q = q.is_empty()
            || order.id.to_lowercase().contains(&q)
            || order.customer_name.to_lowercase().contains(&q)
            || order
                .email
                .as_deref()
                .is_some_and(|e| e.to_lowercase().contains(&q));
        let matches_status = self.status.map_or(true, |s| order.status == s);
        let (from, to) = self.date_bounds();
        let ts = order.timestamp_millis();

        matches_q && matches_status && ts >= from && ts <= to
    }
}

/// Matching orders, newest first
pub fn filter_orders(orders: &[Order], filter: &OrderFilter) -> Vec<Order> {
    let mut out: Vec<Order> = orders.iter().filter(|o| filter.matches(o)).cloned().collect();
    out.sort_by_key(|o| std::cmp::Reverse(o.timestamp_millis()));
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub count: usize,
    pub revenue: f64,
    /// Created, Paid or Dispatched
    pub pending: usize,
}

pub fn summarize(orders: &[Order]) -> OrderSummary {
    OrderSummary {
        count: orders.len(),
        revenue: orders.iter().map(|o| o.amount).sum(),
        pending: orders.iter().filter(|o| o.status.is_pending()).count(),
    }
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Every field quoted, rows joined by `\n`, no trailing newline
pub fn export_csv(orders: &[Order]) -> String {
    let mut rows = vec![CSV_HEADER.iter().map(|h| csv_field(h)).collect::<Vec<_>>().join(",")];

    for order in orders {
        let items = order
            .items
            .iter()
            .map(|i| format!("{} x{}", i.title, i.qty))
            .collect::<Vec<_>>()
            .join(" | ");
        let fields = [
            order.id.clone(),
            order.customer_name.clone(),
            order.email.clone().unwrap_or_default(),
            order.amount.to_string(),
            order.status.to_string(),
            order.placed_at_raw.clone().unwrap_or_default(),
            items,
        ];
        rows.push(fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(","));
    }

    rows.join("\n")
}

/// `orders_YYYY-MM-DD.csv`
pub fn csv_file_name(date: NaiveDate) -> String {
    format!("orders_{}.csv", date.format("%Y-%m-%d"))
}

/// Page cursor that stays inside `1..=total_pages`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    page_size: usize,
    total_items: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total_items: 0,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.page_size).max(1)
    }

    pub fn set_total_items(&mut self, total_items: usize) {
        self.total_items = total_items;
        self.clamp();
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.clamp();
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
        self.clamp();
    }

    pub fn next(&mut self) {
        self.set_page(self.page + 1);
    }

    pub fn prev(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    /// Index range of the current page within the full list
    pub fn range(&self) -> Range<usize> {
        let start = ((self.page - 1) * self.page_size).min(self.total_items);
        let end = (start + self.page_size).min(self.total_items);
        start..end
    }

    fn clamp(&mut self) {
        self.page = self.page.clamp(1, self.total_pages());
    }
}

/// Form state and pagination behind the orders table
#[derive(Debug, Clone)]
pub struct AdminOrdersView {
    orders: Vec<Order>,
    filter: OrderFilter,
    pending_q: Option<String>,
    debouncer: Debouncer,
    filtered: Vec<Order>,
    pagination: Pagination,
}

impl Default for AdminOrdersView {
    fn default() -> Self {
        Self::new(&OrdersConfig::default())
    }
}

impl AdminOrdersView {
    pub fn new(config: &OrdersConfig) -> Self {
        Self {
            orders: Vec::new(),
            filter: OrderFilter::default(),
            pending_q: None,
            debouncer: Debouncer::from_millis(config.debounce_ms),
            filtered: Vec::new(),
            pagination: Pagination::new(config.page_size),
        }
    }

    pub fn set_orders(&mut self, orders: Vec<Order>) {
        self.orders = orders;
        self.recompute();
    }

    /// Text search is debounced; the other filters apply at once
    pub fn edit_query(&mut self, q: impl Into<String>, now: Instant) {
        self.pending_q = Some(q.into());
        self.debouncer.trigger(now);
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        if self.debouncer.poll(now) {
            return self.flush_query();
        }
        false
    }

    pub async fn settle(&mut self) -> bool {
        self.debouncer.settle().await;
        self.flush_query()
    }

    pub fn set_filter(&mut self, filter: OrderFilter) {
        self.pending_q = None;
        self.filter = filter;
        self.recompute();
    }

    pub fn set_status(&mut self, status: Option<OrderStatus>) {
        self.filter.status = status;
        self.recompute();
    }

    pub fn set_date_range(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) {
        self.filter.from = from;
        self.filter.to = to;
        self.recompute();
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.pagination.set_page_size(page_size);
    }

    pub fn set_page(&mut self, page: usize) {
        self.pagination.set_page(page);
    }

    pub fn next_page(&mut self) {
        self.pagination.next();
    }

    pub fn prev_page(&mut self) {
        self.pagination.prev();
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn filter(&self) -> &OrderFilter {
        &self.filter
    }

    pub fn filtered(&self) -> &[Order] {
        &self.filtered
    }

    pub fn page_items(&self) -> &[Order] {
        &self.filtered[self.pagination.range()]
    }

    pub fn summary(&self) -> OrderSummary {
        summarize(&self.filtered)
    }

    pub fn export_csv(&self) -> String {
        export_csv(&self.filtered)
    }

    fn flush_query(&mut self) -> bool {
        match self.pending_q.take() {
            Some(q) => {
                self.filter.q = q;
                self.recompute();
                true
            }
            None => false,
        }
    }

    fn recompute(&mut self) {
        self.filtered = filter_orders(&self.orders, &self.filter);
        self.pagination.set_total_items(self.filtered.len());
    }
}

/// Fetched order list plus the order open in the detail panel
pub struct AdminOrdersStore {
    state: ManagedState,
    api: ApiClient,
    orders: Subject<Vec<Order>>,
    selected: Subject<Option<Order>>,
}

impl std::fmt::Debug for AdminOrdersStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminOrdersStore")
            .field("orders", &self.orders.with(Vec::len))
            .field("selected", &self.selected.with(|o| o.as_ref().map(|o| o.id.clone())))
            .finish()
    }
}

impl AdminOrdersStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            state: ManagedState::new(Uuid::new_v4(), "admin_orders_store"),
            api,
            orders: Subject::new(Vec::new()),
            selected: Subject::new(None),
        }
    }

    pub async fn refresh(&self) -> Result<()> {
        let orders = self.api.admin_orders().await?;
        tracing::debug!(count = orders.len(), "Admin orders refreshed");
        self.orders.set(orders);
        Ok(())
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.get()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Vec<Order>> {
        self.orders.subscribe()
    }

    pub fn open(&self, order: Order) {
        self.selected.set(Some(order));
    }

    pub fn close(&self) {
        self.selected.set(None);
    }

    pub fn selected(&self) -> Option<Order> {
        self.selected.get()
    }

    pub fn subscribe_selected(&self) -> mpsc::UnboundedReceiver<Option<Order>> {
        self.selected.subscribe()
    }

    /// Moves an order to `status`.
    ///
    /// The open detail view is patched before the request is sent and is not
    /// rolled back if the server rejects the change. A failed request is only
    /// logged. Returns whether the server accepted the change.
    pub async fn set_status(&self, order_id: &str, status: OrderStatus) -> bool {
        self.selected.update(|selected| {
            if let Some(order) = selected.as_mut().filter(|o| o.id == order_id) {
                order.apply_status(status, Time::now());
            }
        });

        match self.api.update_order_status(order_id, status).await {
            Ok(()) => {
                tracing::info!(order_id, %status, "Order status updated");
                if let Err(e) = self.refresh().await {
                    tracing::warn!(error = %e, "Failed to refresh orders after status update");
                }
                true
            }
            Err(e) => {
                tracing::warn!(order_id, %status, error = %e, "Order status update failed");
                false
            }
        }
    }
}

#[async_trait]
impl Manager for AdminOrdersStore {
    fn name(&self) -> &str {
        self.state.name()
    }

    fn id(&self) -> Uuid {
        self.state.id()
    }

    async fn initialize(&self) -> Result<()> {
        self.state.set_state(ManagerState::Initializing).await;
        let result = self.refresh().await;
        self.state.finish_initialize(result).await
    }

    async fn shutdown(&self) -> Result<()> {
        self.close();
        self.state.set_state(ManagerState::Shutdown).await;
        Ok(())
    }

    async fn status(&self) -> ManagerStatus {
        let mut status = self.state.status().await;
        status.add_metadata("orders", Value::from(self.orders.with(Vec::len)));
        status
    }
}
