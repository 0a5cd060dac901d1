// src/manager.rs - Lifecycle contract for the long-lived stores

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::Metadata;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagerState {
    Created,
    Initializing,
    Running,
    ShuttingDown,
    Shutdown,
    Error,
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Initializing => write!(f, "INITIALIZING"),
            Self::Running => write!(f, "RUNNING"),
            Self::ShuttingDown => write!(f, "SHUTTING_DOWN"),
            Self::Shutdown => write!(f, "SHUTDOWN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "HEALTHY"),
            Self::Degraded => write!(f, "DEGRADED"),
            Self::Unhealthy => write!(f, "UNHEALTHY"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerStatus {
    pub id: Uuid,
    pub name: String,
    pub state: ManagerState,
    pub health: HealthStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub message: Option<String>,
    pub metadata: Metadata,
}

impl ManagerStatus {
    /// Creates a new manager status
    pub fn new(id: Uuid, name: impl Into<String>, state: ManagerState) -> Self {
        Self {
            id,
            name: name.into(),
            state,
            health: HealthStatus::Unknown,
            created_at: Utc::now(),
            started_at: None,
            last_updated: Utc::now(),
            message: None,
            metadata: Metadata::new(),
        }
    }

    /// Updates the state; health follows it
    pub fn update_state(&mut self, state: ManagerState) {
        self.state = state;
        self.health = match state {
            ManagerState::Running => HealthStatus::Healthy,
            ManagerState::Error => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        };
        self.last_updated = Utc::now();

        if state == ManagerState::Running && self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    /// Sets a status message
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.last_updated = Utc::now();
    }

    /// Adds metadata to the status
    pub fn add_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
        self.last_updated = Utc::now();
    }
}

/// Core trait for the stores the application context owns
#[async_trait::async_trait]
pub trait Manager: Send + Sync + fmt::Debug {
    /// Returns the manager name
    fn name(&self) -> &str;

    /// Returns the manager ID
    fn id(&self) -> Uuid;

    /// Loads initial state
    async fn initialize(&self) -> Result<()>;

    /// Releases state
    async fn shutdown(&self) -> Result<()>;

    /// Returns current status
    async fn status(&self) -> ManagerStatus;

    async fn health_check(&self) -> HealthStatus {
        self.status().await.health
    }
}

/// Managed state container for managers
pub struct ManagedState {
    id: Uuid,
    name: String,
    status: Arc<RwLock<ManagerStatus>>,
}

impl ManagedState {
    /// Creates a new managed state
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        let name_str = name.into();
        let status = ManagerStatus::new(id, name_str.clone(), ManagerState::Created);

        Self {
            id,
            name: name_str,
            status: Arc::new(RwLock::new(status)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the manager state
    pub async fn set_state(&self, state: ManagerState) {
        self.status.write().await.update_state(state);
    }

    /// Sets a status message
    pub async fn set_message(&self, message: impl Into<String>) {
        self.status.write().await.set_message(message);
    }

    /// Returns current status
    pub async fn status(&self) -> ManagerStatus {
        self.status.read().await.clone()
    }

    /// Returns current state
    pub async fn state(&self) -> ManagerState {
        self.status.read().await.state
    }

    /// Records the outcome of an initial load: `Running` on success, `Error`
    /// with the failure message otherwise. The result is passed through.
    pub async fn finish_initialize(&self, result: Result<()>) -> Result<()> {
        let mut status = self.status.write().await;
        match &result {
            Ok(()) => status.update_state(ManagerState::Running),
            Err(e) => {
                status.update_state(ManagerState::Error);
                status.set_message(e.message.clone());
            }
        }
        result
    }
}

impl fmt::Debug for ManagedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedState")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug)]
    struct FlakyStore {
        state: ManagedState,
        online: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Manager for FlakyStore {
        fn name(&self) -> &str {
            self.state.name()
        }

        fn id(&self) -> Uuid {
            self.state.id()
        }

        async fn initialize(&self) -> Result<()> {
            self.state.set_state(ManagerState::Initializing).await;
            let result = if self.online.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(Error::network("/products", "Connection refused"))
            };
            self.state.finish_initialize(result).await
        }

        async fn shutdown(&self) -> Result<()> {
            self.state.set_state(ManagerState::Shutdown).await;
            Ok(())
        }

        async fn status(&self) -> ManagerStatus {
            self.state.status().await
        }
    }

    fn store(online: bool) -> FlakyStore {
        FlakyStore {
            state: ManagedState::new(Uuid::new_v4(), "catalog_store"),
            online: AtomicBool::new(online),
        }
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let store = store(true);
        assert_eq!(store.name(), "catalog_store");
        assert_eq!(store.health_check().await, HealthStatus::Unknown);

        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await, HealthStatus::Healthy);
        assert!(store.status().await.started_at.is_some());

        store.shutdown().await.unwrap();
        assert_eq!(store.state.state().await, ManagerState::Shutdown);
    }

    #[tokio::test]
    async fn test_failed_load_is_recorded() {
        let store = store(false);
        assert!(store.initialize().await.is_err());

        let status = store.status().await;
        assert_eq!(status.state, ManagerState::Error);
        assert_eq!(status.health, HealthStatus::Unhealthy);
        assert_eq!(status.message.as_deref(), Some("Connection refused"));
        assert!(status.started_at.is_none());

        store.online.store(true, Ordering::SeqCst);
        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await, HealthStatus::Healthy);
    }
}
