// src/config/mod.rs

//! Layered configuration
//!
//! Built-in defaults are overlaid, in priority order, by configuration files
//! (YAML, JSON or TOML picked by extension), `STOREFRONT_`-prefixed environment
//! variables and in-memory overrides. Environment keys use `__` to descend
//! into sections, e.g. `STOREFRONT_API__BASE_URL`.

use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, ErrorKind, Result};

pub const ENV_PREFIX: &str = "STOREFRONT";

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub key: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error for '{}': {}", self.key, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConfigSource {
    File { path: PathBuf, format: ConfigFormat },
    Environment { prefix: String },
    Memory { data: Value },
}

#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub name: String,
    pub source: ConfigSource,
    pub priority: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSettings,
    pub logging: LoggingConfig,
    pub api: ApiConfig,
    pub pricing: PricingConfig,
    pub catalog: CatalogConfig,
    pub orders: OrdersConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub data_dir: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "Storefront".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            data_dir: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub console: ConsoleLogConfig,
    pub file: Option<FileLogConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            console: ConsoleLogConfig::default(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleLogConfig {
    pub enabled: bool,
    pub colored: bool,
}

impl Default for ConsoleLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            colored: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            file_prefix: "storefront.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base of every API route, e.g. `http://localhost:5000/api`
    pub base_url: String,
    pub timeout_ms: u64,
    /// Session storage key holding the bearer token
    pub token_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_ms: 15_000,
            token_key: "token".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub free_shipping_threshold: f64,
    pub flat_shipping: f64,
    pub tax_rate: f64,
    pub deal_discount_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: 999.0,
            flat_shipping: 49.0,
            tax_rate: 0.12,
            deal_discount_rate: 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Products revealed per "load more"
    pub reveal_page_size: usize,
    pub debounce_ms: u64,
    pub deals_limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            reveal_page_size: 12,
            debounce_ms: 120,
            deals_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersConfig {
    pub page_size: usize,
    pub debounce_ms: u64,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            debounce_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub ttl_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { ttl_ms: 2800 }
    }
}

impl AppConfig {
    /// Checks values the stores cannot work with
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |key: &str, message: &str| {
            errors.push(ValidationError {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        if self.api.base_url.trim().is_empty() {
            push("api.base_url", "must not be empty");
        }
        if self.api.token_key.trim().is_empty() {
            push("api.token_key", "must not be empty");
        }
        if self.catalog.reveal_page_size == 0 {
            push("catalog.reveal_page_size", "must be at least 1");
        }
        if self.orders.page_size == 0 {
            push("orders.page_size", "must be at least 1");
        }
        for (key, value) in [
            ("pricing.free_shipping_threshold", self.pricing.free_shipping_threshold),
            ("pricing.flat_shipping", self.pricing.flat_shipping),
            ("pricing.tax_rate", self.pricing.tax_rate),
            ("pricing.deal_discount_rate", self.pricing.deal_discount_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                push(key, "must be a non-negative number");
            }
        }
        if self.pricing.deal_discount_rate > 1.0 {
            push("pricing.deal_discount_rate", "must not exceed 1.0");
        }

        errors
    }
}

pub struct ConfigManager {
    layers: Vec<ConfigLayer>,
    merged_config: RwLock<Value>,
}

impl fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigManager")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            merged_config: RwLock::new(Value::Object(Map::new())),
        }
    }

    /// Defaults, then the optional file, then `STOREFRONT_*` variables
    pub fn with_config_file<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        let mut manager = Self::new();
        if let Some(path) = config_path {
            manager.add_file_layer("file", path, 10)?;
        }
        manager.add_env_layer("environment", ENV_PREFIX, 20);
        Ok(manager)
    }

    pub fn add_file_layer<P: AsRef<Path>>(
        &mut self,
        name: impl Into<String>,
        path: P,
        priority: u32,
    ) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        let format = ConfigFormat::from_extension(&path).ok_or_else(|| {
            Error::config(format!(
                "Unsupported configuration file format: {}",
                path.display()
            ))
        })?;

        self.push_layer(ConfigLayer {
            name: name.into(),
            source: ConfigSource::File { path, format },
            priority,
        });
        Ok(())
    }

    pub fn add_env_layer(&mut self, name: impl Into<String>, prefix: impl Into<String>, priority: u32) {
        self.push_layer(ConfigLayer {
            name: name.into(),
            source: ConfigSource::Environment {
                prefix: prefix.into(),
            },
            priority,
        });
    }

    pub fn add_memory_layer(&mut self, name: impl Into<String>, data: Value, priority: u32) {
        self.push_layer(ConfigLayer {
            name: name.into(),
            source: ConfigSource::Memory { data },
            priority,
        });
    }

    fn push_layer(&mut self, layer: ConfigLayer) {
        self.layers.push(layer);
        self.layers.sort_by_key(|l| l.priority);
    }

    /// Merges every layer over the defaults and returns the validated config
    pub fn load(&self) -> Result<AppConfig> {
        let mut merged = serde_json::to_value(AppConfig::default())?;

        for layer in &self.layers {
            let mut layer_config = Self::load_layer(layer)?;
            if matches!(layer.source, ConfigSource::Environment { .. }) {
                layer_config = coerce_like(Some(&merged), layer_config);
            }
            tracing::debug!("Merging configuration layer '{}'", layer.name);
            merge_values(&mut merged, layer_config);
        }

        let config: AppConfig = serde_json::from_value(merged.clone()).map_err(|e| {
            Error::new(
                ErrorKind::Configuration {
                    key: None,
                    validation_errors: vec![e.to_string()],
                },
                format!("Failed to deserialize configuration: {}", e),
            )
        })?;

        let errors = config.validate();
        if !errors.is_empty() {
            return Err(Error::new(
                ErrorKind::Configuration {
                    key: errors.first().map(|e| e.key.clone()),
                    validation_errors: errors.iter().map(ToString::to_string).collect(),
                },
                "Configuration failed validation",
            ));
        }

        *self.merged_config.write() = merged;
        Ok(config)
    }

    /// Reads a dotted key from the last successful `load`
    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let config = self.merged_config.read();
        let value = key
            .split('.')
            .try_fold(&*config, |node, part| node.get(part))
            .cloned()
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::Configuration {
                        key: Some(key.to_string()),
                        validation_errors: vec![format!("Configuration key '{}' not found", key)],
                    },
                    "Configuration key not found",
                )
            })?;

        serde_json::from_value(value).map_err(|e| {
            Error::new(
                ErrorKind::Configuration {
                    key: Some(key.to_string()),
                    validation_errors: vec![e.to_string()],
                },
                format!("Failed to deserialize config value: {}", e),
            )
        })
    }

    fn load_layer(layer: &ConfigLayer) -> Result<Value> {
        match &layer.source {
            ConfigSource::File { path, format } => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("Failed to read config file {}: {}", path.display(), e))
                })?;
                parse_content(&content, *format)
            }
            ConfigSource::Environment { prefix } => Ok(env_layer(prefix, std::env::vars())),
            ConfigSource::Memory { data } => Ok(data.clone()),
        }
    }
}

fn parse_content(content: &str, format: ConfigFormat) -> Result<Value> {
    let parsed = match format {
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| Error::config(format!("Failed to parse {:?} config: {}", format, e)))
}

/// Builds a nested value from `PREFIX_SECTION__KEY=value` pairs. Values stay
/// strings; [`coerce_like`] types them against the layers below.
pub fn env_layer(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Value {
    let marker = format!("{}_", prefix);
    let mut root = Value::Object(Map::new());

    for (key, raw) in vars {
        let Some(path) = key.strip_prefix(&marker) else {
            continue;
        };
        let parts: Vec<String> = path.split("__").map(str::to_lowercase).collect();
        if parts.iter().any(String::is_empty) {
            continue;
        }
        insert_path(&mut root, &parts, Value::String(raw));
    }

    root
}

fn insert_path(node: &mut Value, parts: &[String], value: Value) {
    let Some((head, rest)) = parts.split_first() else {
        return;
    };
    let Value::Object(map) = node else {
        return;
    };
    if rest.is_empty() {
        map.insert(head.clone(), value);
        return;
    }

    let child = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    insert_path(child, rest, value);
}

/// Parses string leaves of `overlay` as JSON where `template` holds a
/// non-string value at the same path. String and unknown keys keep the raw text.
pub fn coerce_like(template: Option<&Value>, overlay: Value) -> Value {
    match overlay {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let below = template.and_then(|t| t.get(&key));
                    let typed = coerce_like(below, value);
                    (key, typed)
                })
                .collect(),
        ),
        Value::String(raw) => match template {
            None | Some(Value::String(_)) => Value::String(raw),
            Some(_) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        },
        other => other,
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
