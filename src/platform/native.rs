// src/platform/native.rs - Native platform implementations

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;

use crate::error::{Error, ErrorKind, Result};
use crate::platform::network::{
    HttpMethod, NetworkProvider, NetworkRequest, NetworkResponse, RequestBody,
};
use crate::platform::storage::StorageProvider;

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct NativeNetwork {
    client: reqwest::Client,
}

impl NativeNetwork {
    pub fn new(timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NetworkProvider for NativeNetwork {
    async fn request(&self, request: NetworkRequest) -> Result<NetworkResponse> {
        let url = request.url.clone();
        let mut req = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Patch => self.client.patch(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        match request.body {
            Some(RequestBody::Json(value)) => {
                req = req.json(&value);
            }
            Some(RequestBody::Multipart {
                field,
                file_name,
                content_type,
                bytes,
            }) => {
                let mut part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                if let Some(content_type) = content_type {
                    part = part.mime_str(&content_type).map_err(|e| {
                        Error::validation("file", format!("Invalid content type: {}", e))
                    })?;
                }
                req = req.multipart(reqwest::multipart::Form::new().part(field, part));
            }
            None => {}
        }

        if let Some(timeout_ms) = request.timeout_ms {
            req = req.timeout(Duration::from_millis(timeout_ms));
        }

        tracing::trace!(method = %request.method, url = %url, "Sending request");

        let response = req
            .send()
            .await
            .map_err(|e| Error::network(&url, format!("HTTP request failed: {}", e)))?;

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_ascii_lowercase(),
                    v.to_str().unwrap_or("").to_string(),
                )
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::network(&url, format!("Failed to read response body: {}", e)))?
            .to_vec();

        Ok(NetworkResponse {
            status_code,
            headers,
            body,
        })
    }
}

/// File-per-key storage under the user data directory
#[derive(Debug, Clone)]
pub struct NativeStorage {
    storage_path: PathBuf,
}

impl NativeStorage {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
        }
    }

    /// `<data dir>/storefront/session`, falling back to `./data`
    pub fn default_location() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default().join("data"));
        Self::new(base.join("storefront").join("session"))
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.storage_path.join(format!("{}.txt", safe_key))
    }

    fn storage_error(key: &str, action: &str, e: std::io::Error) -> Error {
        Error::new(ErrorKind::Io, format!("Failed to {} key {}: {}", action, key, e))
            .source("storage")
    }
}

#[async_trait]
impl StorageProvider for NativeStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.key_to_path(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::storage_error(key, "read", e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.storage_path)
            .await
            .map_err(|e| Self::storage_error(key, "prepare", e))?;
        fs::write(self.key_to_path(key), value)
            .await
            .map_err(|e| Self::storage_error(key, "write", e))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.key_to_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::storage_error(key, "delete", e)),
        }
    }
}
