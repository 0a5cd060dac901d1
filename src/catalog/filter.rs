// src/catalog/filter.rs

//! Catalog filter, sort and reveal pipeline
//!
//! [`apply`] is a pure reducer over a product snapshot and a form snapshot.
//! [`CatalogView`] keeps both inputs, debounces form edits and tracks how
//! many results are revealed.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::catalog::models::Product;
use crate::config::CatalogConfig;
use crate::utils::Debouncer;

pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMode {
    /// Server order, untouched
    #[default]
    #[serde(rename = "relevance")]
    Relevance,
    #[serde(rename = "priceAsc")]
    PriceAsc,
    #[serde(rename = "priceDesc")]
    PriceDesc,
    /// Highest id first
    #[serde(rename = "newest")]
    Newest,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PriceAsc => "priceAsc",
            Self::PriceDesc => "priceDesc",
            Self::Newest => "newest",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Relevance, Self::PriceAsc, Self::PriceDesc, Self::Newest]
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown sort mode '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub q: String,
    pub category: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: f64,
    pub sort: SortMode,
    pub deals_only: bool,
}

impl Default for CatalogFilter {
    fn default() -> Self {
        Self {
            q: String::new(),
            category: ALL_CATEGORIES.to_string(),
            min_price: None,
            max_price: None,
            min_rating: 0.0,
            sort: SortMode::Relevance,
            deals_only: false,
        }
    }
}

impl CatalogFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let q = self.q.trim().to_lowercase();
        let matches_q = q.is_empty()
            || product.title.to_lowercase().contains(&q)
            || product.description.to_lowercase().contains(&q);
        let matches_category =
            self.category == ALL_CATEGORIES || product.category == self.category;
        let matches_price = self.min_price.map_or(true, |min| product.price >= min)
            && self.max_price.map_or(true, |max| product.price <= max);
        let matches_rating = product.rating >= self.min_rating;
        let matches_deal = !self.deals_only || product.is_deal();

        matches_q && matches_category && matches_price && matches_rating && matches_deal
    }

    /// Non-default fields as query parameters
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.q.is_empty() {
            pairs.push(("q", self.q.clone()));
        }
        if self.category != ALL_CATEGORIES && !self.category.is_empty() {
            pairs.push(("category", self.category.clone()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("minPrice", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("maxPrice", max.to_string()));
        }
        if self.min_rating > 0.0 {
            pairs.push(("minRating", self.min_rating.to_string()));
        }
        if self.sort != SortMode::Relevance {
            pairs.push(("sort", self.sort.as_str().to_string()));
        }
        if self.deals_only {
            pairs.push(("deal", "1".to_string()));
        }
        pairs
    }

    pub fn to_query_string(&self) -> String {
        self.to_query_pairs()
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(&value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parses `a=1&b=2`, with or without a leading `?`. Unknown keys and
    /// unparseable values are ignored. `deal` is on whenever present.
    pub fn from_query(query: &str) -> Self {
        let mut filter = Self::default();
        let query = query.trim_start_matches('?');

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(&raw.replace('+', " "))
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string());

            match key {
                "q" => filter.q = value,
                "category" if !value.is_empty() => filter.category = value,
                "minPrice" => filter.min_price = value.parse().ok(),
                "maxPrice" => filter.max_price = value.parse().ok(),
                "minRating" => filter.min_rating = value.parse().unwrap_or(0.0),
                "sort" => filter.sort = value.parse().unwrap_or_default(),
                "deal" => filter.deals_only = true,
                _ => {}
            }
        }

        filter
    }
}

/// Filters then sorts. Relevance keeps the input order.
pub fn apply(products: &[Product], filter: &CatalogFilter) -> Vec<Product> {
    let mut out: Vec<Product> = products
        .iter()
        .filter(|p| filter.matches(p))
        .cloned()
        .collect();

    match filter.sort {
        SortMode::Relevance => {}
        SortMode::PriceAsc => out.sort_by(|a, b| a.price.total_cmp(&b.price)),
        SortMode::PriceDesc => out.sort_by(|a, b| b.price.total_cmp(&a.price)),
        SortMode::Newest => out.sort_by(|a, b| b.id.cmp(&a.id)),
    }
    out
}

/// Discounted products, biggest discount first
pub fn todays_deals(products: &[Product], limit: usize) -> Vec<Product> {
    let mut deals: Vec<Product> = products.iter().filter(|p| p.is_deal()).cloned().collect();
    deals.sort_by_key(|p| std::cmp::Reverse(p.discount_percent()));
    deals.truncate(limit);
    deals
}

/// Product list state behind the catalog page
#[derive(Debug, Clone)]
pub struct CatalogView {
    products: Vec<Product>,
    filter: CatalogFilter,
    pending: Option<CatalogFilter>,
    debouncer: Debouncer,
    filtered: Vec<Product>,
    page_size: usize,
    shown: usize,
    deals_limit: usize,
}

impl Default for CatalogView {
    fn default() -> Self {
        Self::new(&CatalogConfig::default())
    }
}

impl CatalogView {
    pub fn new(config: &CatalogConfig) -> Self {
        let page_size = config.reveal_page_size.max(1);
        Self {
            products: Vec::new(),
            filter: CatalogFilter::default(),
            pending: None,
            debouncer: Debouncer::from_millis(config.debounce_ms),
            filtered: Vec::new(),
            page_size,
            shown: page_size,
            deals_limit: config.deals_limit,
        }
    }

    pub fn set_products(&mut self, products: Vec<Product>) {
        self.products = products;
        self.recompute();
    }

    /// Queues a form edit; it takes effect once the debounce delay passes
    pub fn edit_filter(&mut self, filter: CatalogFilter, now: Instant) {
        self.pending = Some(filter);
        self.debouncer.trigger(now);
    }

    /// Applies the queued edit if its delay has elapsed
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.debouncer.poll(now) {
            return self.flush();
        }
        false
    }

    /// Waits out the debounce delay and applies the queued edit
    pub async fn settle(&mut self) -> bool {
        self.debouncer.settle().await;
        self.flush()
    }

    /// Replaces the form immediately, e.g. when restored from a URL
    pub fn set_filter(&mut self, filter: CatalogFilter) {
        self.pending = None;
        self.filter = filter;
        self.recompute();
        self.reset_reveal();
    }

    pub fn set_deals_only(&mut self, deals_only: bool) {
        self.filter.deals_only = deals_only;
        if let Some(pending) = self.pending.as_mut() {
            pending.deals_only = deals_only;
        }
        self.recompute();
        self.reset_reveal();
    }

    pub fn load_more(&mut self) {
        self.shown += self.page_size;
    }

    pub fn filter(&self) -> &CatalogFilter {
        &self.filter
    }

    pub fn has_pending_edit(&self) -> bool {
        self.pending.is_some()
    }

    pub fn filtered(&self) -> &[Product] {
        &self.filtered
    }

    pub fn visible(&self) -> &[Product] {
        &self.filtered[..self.shown.min(self.filtered.len())]
    }

    pub fn has_more(&self) -> bool {
        self.shown < self.filtered.len()
    }

    pub fn shown(&self) -> usize {
        self.shown
    }

    pub fn deals(&self) -> Vec<Product> {
        todays_deals(&self.products, self.deals_limit)
    }

    fn flush(&mut self) -> bool {
        match self.pending.take() {
            Some(filter) => {
                tracing::debug!(query = %filter.to_query_string(), "Catalog filter applied");
                self.filter = filter;
                self.recompute();
                self.reset_reveal();
                true
            }
            None => false,
        }
    }

    fn recompute(&mut self) {
        self.filtered = apply(&self.products, &self.filter);
    }

    fn reset_reveal(&mut self) {
        self.shown = self.page_size;
    }
}
