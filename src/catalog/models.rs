// src/catalog/models.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{ProductId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_url: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_price: Option<f64>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: u32,
    /// Display flag; `stock` is authoritative
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<String>,
}

impl Product {
    pub fn is_deal(&self) -> bool {
        matches!(self.old_price, Some(old) if self.price < old)
    }

    /// Whole percent saved against `old_price`, 0 when not discounted
    pub fn discount_percent(&self) -> u32 {
        match self.old_price {
            Some(old) if old > self.price && old > 0.0 => {
                ((1.0 - self.price / old) * 100.0).round() as u32
            }
            _ => 0,
        }
    }
}

/// Writable product fields for admin create and update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_price: Option<f64>,
    pub in_stock: bool,
    pub stock: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<String>,
}

impl ProductDraft {
    /// New products always start unrated
    pub fn create_body(&self) -> Value {
        let mut body = self.fields();
        body.insert("rating".into(), Value::from(0));
        body.insert("reviews".into(), Value::from(0));
        Value::Object(body)
    }

    /// Rating and review count are server-owned and never sent on update
    pub fn update_body(&self) -> Value {
        Value::Object(self.fields())
    }

    fn fields(&self) -> Map<String, Value> {
        let mut fields = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        fields.remove("rating");
        fields.remove("reviews");
        fields
    }
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            image_url: product.image_url.clone(),
            price: product.price,
            old_price: product.old_price,
            in_stock: product.in_stock,
            stock: product.stock,
            delivery: product.delivery.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    pub rating: u8,
    pub comment: String,
    /// ISO-8601, compared as text
    pub created_at: String,
}

/// Server-side listing parameters for `GET /products`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ProductQuery {
    /// Present, non-empty parameters in wire naming
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                pairs.push((key.to_string(), value));
            }
        };

        push("search", self.search.clone());
        push("category", self.category.clone());
        push("minPrice", self.min_price.map(|v| v.to_string()));
        push("maxPrice", self.max_price.map(|v| v.to_string()));
        push("minRating", self.min_rating.map(|v| v.to_string()));
        push("sort", self.sort.clone());
        push("page", self.page.map(|v| v.to_string()));
        push("pageSize", self.page_size.map(|v| v.to_string()));
        pairs
    }
}

/// One listing response with its paging headers
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[cfg(test)]
pub(crate) fn product(id: ProductId, title: &str, price: f64) -> Product {
    Product {
        id,
        title: title.to_string(),
        description: String::new(),
        category: "Audio".to_string(),
        image_url: String::new(),
        price,
        old_price: None,
        rating: 0.0,
        reviews: 0,
        in_stock: true,
        stock: 10,
        delivery: None,
    }
}
