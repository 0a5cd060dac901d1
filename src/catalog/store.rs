// src/catalog/store.rs

use std::collections::BTreeSet;

use async_trait::async_trait;
use futures::channel::mpsc;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::catalog::models::{Product, ProductDraft, ProductQuery};
use crate::error::Result;
use crate::event::Subject;
use crate::manager::{ManagedState, Manager, ManagerState, ManagerStatus};
use crate::types::ProductId;

/// Paging headers from the last listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageInfo {
    fn default() -> Self {
        Self {
            total: 0,
            page: 1,
            page_size: 20,
        }
    }
}

/// Last product listing fetched from the API
pub struct CatalogStore {
    state: ManagedState,
    api: ApiClient,
    products: Subject<Vec<Product>>,
    page: RwLock<PageInfo>,
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("products", &self.products.with(Vec::len))
            .field("page", &*self.page.read())
            .finish()
    }
}

impl CatalogStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            state: ManagedState::new(Uuid::new_v4(), "catalog_store"),
            api,
            products: Subject::new(Vec::new()),
            page: RwLock::new(PageInfo::default()),
        }
    }

    /// Fetches a listing and publishes it
    pub async fn refresh(&self, query: &ProductQuery) -> Result<()> {
        let page = self.api.list_products(query).await?;
        *self.page.write() = PageInfo {
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        };
        tracing::debug!(
            count = page.products.len(),
            total = page.total,
            "Catalog refreshed"
        );
        self.products.set(page.products);
        Ok(())
    }

    pub fn products(&self) -> Vec<Product> {
        self.products.get()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Vec<Product>> {
        self.products.subscribe()
    }

    pub fn page_info(&self) -> PageInfo {
        *self.page.read()
    }

    /// Distinct categories of the current listing, sorted
    pub fn categories(&self) -> Vec<String> {
        self.products.with(|list| {
            list.iter()
                .map(|p| p.category.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
    }

    /// Any failure, including 404, reads as absent
    pub async fn get(&self, id: ProductId) -> Option<Product> {
        match self.api.get_product(id).await {
            Ok(product) => Some(product),
            Err(e) => {
                tracing::debug!(product_id = id, error = %e, "Product lookup failed");
                None
            }
        }
    }

    pub async fn create(&self, draft: &ProductDraft) -> Result<Product> {
        let product = self.api.create_product(draft.create_body()).await?;
        tracing::info!(product_id = product.id, "Product created");
        self.refresh(&ProductQuery::default()).await?;
        Ok(product)
    }

    pub async fn update(&self, id: ProductId, draft: &ProductDraft) -> Result<Product> {
        let product = self.api.update_product(id, draft.update_body()).await?;
        tracing::info!(product_id = id, "Product updated");
        self.refresh(&ProductQuery::default()).await?;
        Ok(product)
    }

    pub async fn delete(&self, id: ProductId) -> Result<()> {
        self.api.delete_product(id).await?;
        tracing::info!(product_id = id, "Product deleted");
        self.refresh(&ProductQuery::default()).await
    }
}

#[async_trait]
impl Manager for CatalogStore {
    fn name(&self) -> &str {
        self.state.name()
    }

    fn id(&self) -> Uuid {
        self.state.id()
    }

    async fn initialize(&self) -> Result<()> {
        self.state.set_state(ManagerState::Initializing).await;
        let result = self.refresh(&ProductQuery::default()).await;
        self.state.finish_initialize(result).await
    }

    async fn shutdown(&self) -> Result<()> {
        self.state.set_state(ManagerState::Shutdown).await;
        Ok(())
    }

    async fn status(&self) -> ManagerStatus {
        let mut status = self.state.status().await;
        let page = self.page_info();
        status.add_metadata("products", Value::from(self.products.with(Vec::len)));
        status.add_metadata("total", Value::from(page.total));
        status
    }
}
