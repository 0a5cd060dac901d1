// src/app.rs

//! Application context
//!
//! [`Storefront`] builds every store from one [`AppConfig`] and a set of
//! platform providers, then drives their lifecycle. Stores are shared through
//! `Arc` handles; nothing is global.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::timeout;
use uuid::Uuid;

use crate::admin::{AdminOrdersStore, AdminOrdersView};
use crate::api::ApiClient;
use crate::auth::SessionManager;
use crate::catalog::{CatalogStore, CatalogView, Product, ReviewCache};
use crate::config::AppConfig;
use crate::define_event;
use crate::error::{Error, ManagerOperation, Result};
use crate::event::EventBus;
use crate::manager::{HealthStatus, ManagedState, Manager, ManagerState, ManagerStatus};
use crate::notifications::NotificationCenter;
use crate::platform::PlatformProviders;
use crate::shop::{CartStore, OrderService};

const MANAGER_TIMEOUT: Duration = Duration::from_secs(10);

define_event!(StorefrontStarted, "app.started", version: String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontHealth {
    pub status: HealthStatus,
    pub uptime: Duration,
    pub managers: HashMap<String, HealthStatus>,
    pub last_check: DateTime<Utc>,
}

pub struct Storefront {
    state: ManagedState,
    config: AppConfig,
    started_at: DateTime<Utc>,
    event_bus: Arc<EventBus>,
    api: ApiClient,
    notifications: Arc<NotificationCenter>,
    session: Arc<SessionManager>,
    catalog: Arc<CatalogStore>,
    reviews: Arc<ReviewCache>,
    cart: Arc<CartStore>,
    orders: Arc<OrderService>,
    admin_orders: Arc<AdminOrdersStore>,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("environment", &self.config.app.environment)
            .field("base_url", &self.api.base_url())
            .finish_non_exhaustive()
    }
}

impl Storefront {
    pub fn new(config: AppConfig, providers: PlatformProviders) -> Self {
        let event_bus = Arc::new(EventBus::new());
        let api = ApiClient::new(providers.network, &config.api);

        let session = Arc::new(
            SessionManager::new(api.clone(), providers.storage, config.api.token_key.clone())
                .with_event_bus(event_bus.clone()),
        );
        let catalog = Arc::new(CatalogStore::new(api.clone()));
        let reviews = Arc::new(ReviewCache::new(
            api.clone(),
            session.clone(),
            catalog.clone(),
        ));
        let cart = Arc::new(CartStore::new(config.pricing.clone()));
        let orders = Arc::new(
            OrderService::new(api.clone(), cart.clone()).with_event_bus(event_bus.clone()),
        );
        let admin_orders = Arc::new(AdminOrdersStore::new(api.clone()));
        let notifications = Arc::new(NotificationCenter::new(&config.notifications));

        Self {
            state: ManagedState::new(Uuid::new_v4(), "storefront"),
            config,
            started_at: Utc::now(),
            event_bus,
            api,
            notifications,
            session,
            catalog,
            reviews,
            cart,
            orders,
            admin_orders,
        }
    }

    /// Production wiring: reqwest transport and file-backed session storage
    pub fn native(config: AppConfig) -> Result<Self> {
        let providers = PlatformProviders::native(&config)?;
        Ok(Self::new(config, providers))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn notifications(&self) -> &Arc<NotificationCenter> {
        &self.notifications
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    pub fn reviews(&self) -> &Arc<ReviewCache> {
        &self.reviews
    }

    pub fn cart(&self) -> &Arc<CartStore> {
        &self.cart
    }

    pub fn orders(&self) -> &Arc<OrderService> {
        &self.orders
    }

    pub fn admin_orders(&self) -> &Arc<AdminOrdersStore> {
        &self.admin_orders
    }

    pub fn catalog_view(&self) -> CatalogView {
        let mut view = CatalogView::new(&self.config.catalog);
        view.set_products(self.catalog.products());
        view
    }

    pub fn admin_orders_view(&self) -> AdminOrdersView {
        let mut view = AdminOrdersView::new(&self.config.orders);
        view.set_orders(self.admin_orders.orders());
        view
    }

    /// Shows a toast for `error` and hands it back for logging
    pub fn report(&self, error: Error) -> Error {
        self.notifications.report(&error);
        error
    }

    /// Adds a product to the cart, toasting the rejection when it is out of stock
    pub fn add_to_cart(&self, product: &Product, qty: u32) -> Result<()> {
        self.cart
            .add_product(product, qty)
            .map_err(|error| self.report(error))
    }

    /// Data stores to load once the session is restored. The admin order
    /// list is only fetched for admins.
    fn data_managers(&self) -> Vec<Arc<dyn Manager>> {
        let mut managers: Vec<Arc<dyn Manager>> = vec![self.catalog.clone()];
        if self.session.is_admin() {
            managers.push(self.admin_orders.clone());
        }
        managers
    }

    fn all_managers(&self) -> Vec<Arc<dyn Manager>> {
        vec![
            self.session.clone(),
            self.catalog.clone(),
            self.admin_orders.clone(),
        ]
    }

    async fn run_initialize(&self, manager: Arc<dyn Manager>) -> bool {
        match timeout(MANAGER_TIMEOUT, manager.initialize()).await {
            Ok(Ok(())) => {
                tracing::info!("Initialized manager: {}", manager.name());
                true
            }
            Ok(Err(e)) => {
                tracing::error!("Failed to initialize manager {}: {}", manager.name(), e);
                self.notifications.report(&e);
                false
            }
            Err(_) => {
                tracing::error!("Timeout initializing manager: {}", manager.name());
                self.notifications.report(&Error::manager(
                    manager.name(),
                    ManagerOperation::Initialize,
                    "Timed out",
                ));
                false
            }
        }
    }

    pub async fn health(&self) -> StorefrontHealth {
        let mut managers = HashMap::new();
        let mut healthy = true;
        for manager in self.all_managers() {
            let health = manager.health_check().await;
            if health == HealthStatus::Unhealthy {
                healthy = false;
            }
            managers.insert(manager.name().to_string(), health);
        }

        StorefrontHealth {
            status: if healthy {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            uptime: Utc::now()
                .signed_duration_since(self.started_at)
                .to_std()
                .unwrap_or_default(),
            managers,
            last_check: Utc::now(),
        }
    }
}

#[async_trait]
impl Manager for Storefront {
    fn name(&self) -> &str {
        self.state.name()
    }

    fn id(&self) -> Uuid {
        self.state.id()
    }

    /// Failures are reported as toasts and never abort startup
    async fn initialize(&self) -> Result<()> {
        self.state.set_state(ManagerState::Initializing).await;
        tracing::info!(base_url = %self.api.base_url(), "Initializing storefront");

        // Restore first: later fetches need the token and the role decides
        // which stores load.
        let mut failed = usize::from(!self.run_initialize(self.session.clone()).await);
        for manager in self.data_managers() {
            if !self.run_initialize(manager).await {
                failed += 1;
            }
        }

        if failed > 0 {
            self.state
                .set_message(format!("{failed} manager(s) failed to initialize"))
                .await;
        }
        self.state.set_state(ManagerState::Running).await;
        self.event_bus.publish(StorefrontStarted::new(
            "storefront",
            crate::VERSION.to_string(),
        ));
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.state.set_state(ManagerState::ShuttingDown).await;
        for manager in self.all_managers().into_iter().rev() {
            match timeout(MANAGER_TIMEOUT, manager.shutdown()).await {
                Ok(Ok(())) => tracing::info!("Shut down manager: {}", manager.name()),
                Ok(Err(e)) => {
                    tracing::error!("Error shutting down manager {}: {}", manager.name(), e)
                }
                Err(_) => tracing::error!("Timeout shutting down manager: {}", manager.name()),
            }
        }
        self.notifications.clear();
        self.state.set_state(ManagerState::Shutdown).await;
        Ok(())
    }

    async fn status(&self) -> ManagerStatus {
        let mut status = self.state.status().await;
        status.add_metadata("version", Value::from(crate::VERSION));
        status.add_metadata("cart_items", Value::from(self.cart.item_count()));
        status.add_metadata("logged_in", Value::Bool(self.session.is_logged_in()));
        status
    }
}
