// src/platform/mod.rs - Platform providers

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;

pub mod memory;
pub mod native;
pub mod network;
pub mod storage;

pub use memory::MemoryNetwork;
pub use native::{NativeNetwork, NativeStorage};
pub use network::{
    HttpMethod, NetworkArc, NetworkProvider, NetworkRequest, NetworkResponse, RequestBody,
};
pub use storage::{MemoryStorage, StorageArc, StorageProvider};

/// Transport and session storage handed to every store
#[derive(Clone)]
pub struct PlatformProviders {
    pub network: NetworkArc,
    pub storage: StorageArc,
}

impl std::fmt::Debug for PlatformProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformProviders").finish_non_exhaustive()
    }
}

impl PlatformProviders {
    /// reqwest transport and file-backed session storage under the data dir.
    /// An empty `app.data_dir` selects the platform data directory.
    pub fn native(config: &AppConfig) -> Result<Self> {
        let storage = if config.app.data_dir.as_os_str().is_empty() {
            NativeStorage::default_location()
        } else {
            NativeStorage::new(config.app.data_dir.join("session"))
        };
        Ok(Self {
            network: Arc::new(NativeNetwork::new(config.api.timeout_ms)?),
            storage: Arc::new(storage),
        })
    }

    pub fn new(network: NetworkArc, storage: StorageArc) -> Self {
        Self { network, storage }
    }
}
