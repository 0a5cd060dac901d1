// src/catalog/reviews.rs

//! Per-product review cache
//!
//! Lists are kept newest first. A user may review a product once; the check
//! runs against the cached list, so callers reload before offering the form.

use std::sync::Arc;

use dashmap::DashMap;
use futures::channel::mpsc;

use crate::api::ApiClient;
use crate::auth::SessionManager;
use crate::catalog::models::{ProductQuery, Review};
use crate::catalog::store::CatalogStore;
use crate::error::{BusinessRule, Error, Result};
use crate::event::Subject;
use crate::types::ProductId;

pub const MAX_COMMENT_CHARS: usize = 500;

pub struct ReviewCache {
    api: ApiClient,
    session: Arc<SessionManager>,
    catalog: Arc<CatalogStore>,
    reviews: DashMap<ProductId, Arc<Subject<Vec<Review>>>>,
}

impl std::fmt::Debug for ReviewCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewCache")
            .field("products", &self.reviews.len())
            .finish()
    }
}

fn newest_first(mut reviews: Vec<Review>) -> Vec<Review> {
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    reviews
}

impl ReviewCache {
    pub fn new(api: ApiClient, session: Arc<SessionManager>, catalog: Arc<CatalogStore>) -> Self {
        Self {
            api,
            session,
            catalog,
            reviews: DashMap::new(),
        }
    }

    fn subject(&self, product_id: ProductId) -> Arc<Subject<Vec<Review>>> {
        self.reviews
            .entry(product_id)
            .or_insert_with(|| Arc::new(Subject::new(Vec::new())))
            .clone()
    }

    pub async fn reload(&self, product_id: ProductId) -> Result<Vec<Review>> {
        let reviews = newest_first(self.api.list_reviews(product_id).await?);
        tracing::debug!(product_id, count = reviews.len(), "Reviews loaded");
        self.subject(product_id).set(reviews.clone());
        Ok(reviews)
    }

    pub fn for_product(&self, product_id: ProductId) -> Vec<Review> {
        self.reviews
            .get(&product_id)
            .map(|subject| subject.get())
            .unwrap_or_default()
    }

    pub fn subscribe(&self, product_id: ProductId) -> mpsc::UnboundedReceiver<Vec<Review>> {
        self.subject(product_id).subscribe()
    }

    /// Mean rating to one decimal, `None` without reviews
    pub fn average_rating(&self, product_id: ProductId) -> Option<f64> {
        let reviews = self.for_product(product_id);
        if reviews.is_empty() {
            return None;
        }
        let sum: u32 = reviews.iter().map(|r| r.rating as u32).sum();
        Some((sum as f64 / reviews.len() as f64 * 10.0).round() / 10.0)
    }

    /// Whether the signed-in user already has a review here, matched by id or email
    pub fn has_reviewed(&self, product_id: ProductId) -> bool {
        let Some(user) = self.session.user() else {
            return false;
        };
        self.for_product(product_id).iter().any(|r| {
            r.product_id == product_id
                && (r.user_id == user.id || r.user_email.as_deref() == Some(user.email.as_str()))
        })
    }

    pub async fn add(&self, product_id: ProductId, rating: u8, comment: &str) -> Result<Review> {
        if !self.session.is_logged_in() {
            return Err(Error::authentication("Please sign in to review"));
        }
        if self.has_reviewed(product_id) {
            return Err(Error::business(
                BusinessRule::DuplicateReview,
                "You already reviewed this product",
            ));
        }
        if !(1..=5).contains(&rating) {
            return Err(Error::validation("rating", "Rating must be between 1 and 5"));
        }
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(Error::validation("comment", "Comment is required"));
        }
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(Error::validation(
                "comment",
                format!("Comment must be at most {} characters", MAX_COMMENT_CHARS),
            ));
        }

        let review = self.api.create_review(product_id, rating, comment).await?;
        tracing::info!(product_id, review_id = review.id, "Review added");

        if let Err(e) = self.reload(product_id).await {
            tracing::warn!(product_id, error = %e, "Failed to reload reviews");
        }
        if let Err(e) = self.catalog.refresh(&ProductQuery::default()).await {
            tracing::warn!(error = %e, "Failed to refresh catalog after review");
        }
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::make_token;
    use crate::config::ApiConfig;
    use crate::error::ErrorKind;
    use crate::platform::{HttpMethod, MemoryNetwork, MemoryStorage};
    use serde_json::json;

    const BASE: &str = "http://localhost:5000/api";

    async fn cache(network: Arc<MemoryNetwork>, logged_in: bool) -> ReviewCache {
        let api = ApiClient::new(network, &ApiConfig::default());
        let storage = if logged_in {
            let token = make_token(json!({"sub": 5, "email": "me@example.com"}));
            MemoryStorage::with_entry("token", &token)
        } else {
            MemoryStorage::new()
        };
        let session = Arc::new(SessionManager::new(api.clone(), Arc::new(storage), "token"));
        session.restore().await.unwrap();
        let catalog = Arc::new(CatalogStore::new(api.clone()));
        ReviewCache::new(api, session, catalog)
    }

    fn reviews() -> serde_json::Value {
        json!([
            {"id": 1, "productId": 10, "userId": 8, "userName": "A", "rating": 4,
             "comment": "ok", "createdAt": "2024-01-01T00:00:00Z"},
            {"id": 2, "productId": 10, "userId": 9, "userName": "B", "userEmail": "me@example.com",
             "rating": 5, "comment": "great", "createdAt": "2024-03-01T00:00:00Z"}
        ])
    }

    #[tokio::test]
    async fn test_reload_sorts_newest_first() {
        let network = Arc::new(MemoryNetwork::new(BASE));
        network.respond_json(HttpMethod::Get, "/products/10/reviews", 200, reviews());
        let cache = cache(network, true).await;

        cache.reload(10).await.unwrap();
        let ids: Vec<i64> = cache.for_product(10).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(cache.average_rating(10), Some(4.5));
        assert_eq!(cache.average_rating(11), None);
    }

    #[tokio::test]
    async fn test_has_reviewed_matches_email() {
        let network = Arc::new(MemoryNetwork::new(BASE));
        network.respond_json(HttpMethod::Get, "/products/10/reviews", 200, reviews());
        let cache = cache(network, true).await;

        cache.reload(10).await.unwrap();
        assert!(cache.has_reviewed(10));

        let err = cache.add(10, 5, "again").await.unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::BusinessRule {
                rule: BusinessRule::DuplicateReview
            }
        ));
    }

    #[tokio::test]
    async fn test_add_rejections() {
        let network = Arc::new(MemoryNetwork::new(BASE));
        let anonymous = cache(network.clone(), false).await;
        let err = anonymous.add(10, 5, "nice").await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Authentication { .. }));

        let cache = cache(network.clone(), true).await;
        for (rating, comment) in [(0, "fine"), (6, "fine"), (3, "   ")] {
            let err = cache.add(10, rating, comment).await.unwrap_err();
            assert!(matches!(err.kind, ErrorKind::Validation { .. }));
        }
        let long = "x".repeat(501);
        assert!(cache.add(10, 3, &long).await.is_err());
        assert!(network.requests().is_empty());
    }

    #[tokio::test]
    async fn test_add_posts_and_reloads() {
        let network = Arc::new(MemoryNetwork::new(BASE));
        network.respond_json(
            HttpMethod::Post,
            "/products/10/reviews",
            201,
            json!({"id": 3, "productId": 10, "userId": 5, "userName": "you", "rating": 5,
                   "comment": "solid", "createdAt": "2024-04-01T00:00:00Z"}),
        );
        network.respond_json(
            HttpMethod::Get,
            "/products/10/reviews",
            200,
            json!([{"id": 3, "productId": 10, "userId": 5, "userName": "you", "rating": 5,
                    "comment": "solid", "createdAt": "2024-04-01T00:00:00Z"}]),
        );
        network.respond_json(HttpMethod::Get, "/products", 200, json!([]));
        let cache = cache(network.clone(), true).await;

        let review = cache.add(10, 5, "  solid  ").await.unwrap();
        assert_eq!(review.id, 3);
        assert!(cache.has_reviewed(10));

        let posted = network.requests_to(HttpMethod::Post, "/products/10/reviews");
        assert_eq!(posted[0].json_body().unwrap()["comment"], "solid");
        assert_eq!(network.requests_to(HttpMethod::Get, "/products").len(), 1);
    }
}
