use std::collections::HashMap;
use serde_json::Value;

/// Generic metadata container
pub type Metadata = HashMap<String, Value>;

/// Catalog product identifier as issued by the API
pub type ProductId = i64;

/// Account identifier as issued by the API
pub type UserId = i64;
