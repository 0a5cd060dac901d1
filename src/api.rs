// src/api.rs

//! Typed client for the storefront HTTP API
//!
//! Every request goes through [`ApiClient::send`], which attaches the bearer
//! token when one is held and turns non-success statuses into [`Error`]s via
//! [`Error::from_status`].

use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::UserRole;
use crate::catalog::models::{Product, ProductPage, ProductQuery, Review};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::platform::{HttpMethod, NetworkArc, NetworkRequest, NetworkResponse, RequestBody};
use crate::shop::models::{Order, OrderStatus};
use crate::types::{ProductId, UserId};

/// Body of `/auth/login` and `/auth/register`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    image_url: String,
}

#[derive(Clone)]
pub struct ApiClient {
    network: NetworkArc,
    base_url: String,
    timeout_ms: u64,
    token: Arc<RwLock<Option<String>>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.read().is_some())
            .finish()
    }
}

impl ApiClient {
    pub fn new(network: NetworkArc, config: &ApiConfig) -> Self {
        Self {
            network,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn request(&self, method: HttpMethod, path: &str) -> NetworkRequest {
        NetworkRequest::new(method, self.url(path)).timeout_ms(self.timeout_ms)
    }

    /// Sends a request and fails on any non-2xx status
    pub async fn send(&self, mut request: NetworkRequest) -> Result<NetworkResponse> {
        if let Some(token) = self.token() {
            request
                .headers
                .insert("Authorization".to_string(), format!("Bearer {}", token));
        }

        let endpoint = request
            .url
            .strip_prefix(&self.base_url)
            .unwrap_or(&request.url)
            .to_string();
        let method = request.method;

        let response = self.network.request(request).await.map_err(|e| {
            tracing::debug!(%method, %endpoint, error = %e, "Transport failure");
            e
        })?;

        if response.is_success() {
            tracing::trace!(%method, %endpoint, status = response.status_code, "Request succeeded");
            return Ok(response);
        }

        let message = server_message(&response);
        tracing::debug!(%method, %endpoint, status = response.status_code, %message, "Request failed");
        Err(Error::from_status(response.status_code, &endpoint, message))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: NetworkRequest) -> Result<T> {
        self.send(request).await?.parse()
    }

    // Catalog

    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let mut request = self.request(HttpMethod::Get, "/products");
        request.query = query.to_pairs();
        let response = self.send(request).await?;

        let header_num = |name: &str| response.header(name).and_then(|v| v.trim().parse::<u64>().ok());
        let products: Vec<Product> = if response.body.is_empty() {
            Vec::new()
        } else {
            response.parse::<Option<Vec<Product>>>()?.unwrap_or_default()
        };

        Ok(ProductPage {
            total: header_num("X-Total-Count").unwrap_or(0),
            page: header_num("X-Page")
                .map(|v| v as u32)
                .or(query.page)
                .unwrap_or(1),
            page_size: header_num("X-Page-Size")
                .map(|v| v as u32)
                .or(query.page_size)
                .unwrap_or(20),
            products,
        })
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.fetch(self.request(HttpMethod::Get, &format!("/products/{}", id)))
            .await
    }

    pub async fn create_product(&self, body: Value) -> Result<Product> {
        self.fetch(self.request(HttpMethod::Post, "/products").json(body))
            .await
    }

    pub async fn update_product(&self, id: ProductId, body: Value) -> Result<Product> {
        self.fetch(
            self.request(HttpMethod::Patch, &format!("/products/{}", id))
                .json(body),
        )
        .await
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        self.send(self.request(HttpMethod::Delete, &format!("/products/{}", id)))
            .await
            .map(|_| ())
    }

    pub async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>> {
        self.fetch::<Option<Vec<Review>>>(
            self.request(HttpMethod::Get, &format!("/products/{}/reviews", product_id)),
        )
        .await
        .map(Option::unwrap_or_default)
    }

    pub async fn create_review(
        &self,
        product_id: ProductId,
        rating: u8,
        comment: &str,
    ) -> Result<Review> {
        self.fetch(
            self.request(HttpMethod::Post, &format!("/products/{}/reviews", product_id))
                .json(json!({ "rating": rating, "comment": comment })),
        )
        .await
    }

    // Orders

    pub async fn create_order(&self, body: Value) -> Result<Order> {
        self.fetch(self.request(HttpMethod::Post, "/orders").json(body))
            .await
    }

    pub async fn my_orders(&self) -> Result<Vec<Order>> {
        self.fetch::<Option<Vec<Order>>>(self.request(HttpMethod::Get, "/orders"))
            .await
            .map(Option::unwrap_or_default)
    }

    pub async fn cancel_order(&self, id: &str) -> Result<()> {
        self.send(
            self.request(HttpMethod::Patch, &format!("/orders/{}", id))
                .json(json!({ "action": "cancel" })),
        )
        .await
        .map(|_| ())
    }

    pub async fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<()> {
        self.send(
            self.request(HttpMethod::Patch, &format!("/orders/{}", id))
                .json(json!({ "status": status })),
        )
        .await
        .map(|_| ())
    }

    pub async fn admin_orders(&self) -> Result<Vec<Order>> {
        self.fetch::<Option<Vec<Order>>>(self.request(HttpMethod::Get, "/admin/orders"))
            .await
            .map(Option::unwrap_or_default)
    }

    // Auth

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        self.fetch(
            self.request(HttpMethod::Post, "/auth/login")
                .json(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse> {
        self.fetch(
            self.request(HttpMethod::Post, "/auth/register")
                .json(json!({ "name": name, "email": email, "password": password })),
        )
        .await
    }

    /// Uploads one image and returns the `imageUrl` exactly as the server sent it
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let request = self
            .request(HttpMethod::Post, "/upload")
            .body(RequestBody::Multipart {
                field: "file".to_string(),
                file_name: file_name.to_string(),
                content_type: content_type.map(str::to_string),
                bytes,
            });
        self.fetch::<UploadResponse>(request)
            .await
            .map(|r| r.image_url)
    }
}

/// `message` or `error` from a JSON body, else the body text
fn server_message(response: &NetworkResponse) -> String {
    if let Ok(body) = serde_json::from_slice::<Value>(&response.body) {
        for key in ["message", "error"] {
            if let Some(message) = body.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }
    let text = response.text();
    let text = text.trim();
    if text.is_empty() {
        format!("Request failed with status {}", response.status_code)
    } else {
        text.to_string()
    }
}
