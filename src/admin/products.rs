// src/admin/products.rs

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::catalog::filter::ALL_CATEGORIES;
use crate::catalog::models::Product;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdminSort {
    /// Highest id first
    #[default]
    Updated,
    PriceAsc,
    PriceDesc,
    StockAsc,
    StockDesc,
}

impl AdminSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::PriceAsc => "priceAsc",
            Self::PriceDesc => "priceDesc",
            Self::StockAsc => "stockAsc",
            Self::StockDesc => "stockDesc",
        }
    }
}

impl FromStr for AdminSort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "updated" => Ok(Self::Updated),
            "priceAsc" => Ok(Self::PriceAsc),
            "priceDesc" => Ok(Self::PriceDesc),
            "stockAsc" => Ok(Self::StockAsc),
            "stockDesc" => Ok(Self::StockDesc),
            other => Err(format!("unknown sort mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminProductFilter {
    pub q: String,
    pub category: String,
    pub sort: AdminSort,
}

impl Default for AdminProductFilter {
    fn default() -> Self {
        Self {
            q: String::new(),
            category: ALL_CATEGORIES.to_string(),
            sort: AdminSort::Updated,
        }
    }
}

impl AdminProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let q = self.q.trim().to_lowercase();
        let matches_q = q.is_empty()
            || product.title.to_lowercase().contains(&q)
            || product.description.to_lowercase().contains(&q);
        let matches_category = self.category.is_empty()
            || self.category == ALL_CATEGORIES
            || product.category == self.category;
        matches_q && matches_category
    }

    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let mut out: Vec<Product> = products.iter().filter(|p| self.matches(p)).cloned().collect();
        match self.sort {
            AdminSort::Updated => out.sort_by(|a, b| b.id.cmp(&a.id)),
            AdminSort::PriceAsc => out.sort_by(|a, b| a.price.total_cmp(&b.price)),
            AdminSort::PriceDesc => out.sort_by(|a, b| b.price.total_cmp(&a.price)),
            AdminSort::StockAsc => out.sort_by_key(|p| p.stock),
            AdminSort::StockDesc => out.sort_by_key(|p| std::cmp::Reverse(p.stock)),
        }
        out
    }
}

/// Base URL without a trailing `/api` segment
pub fn api_origin(base_url: &str) -> &str {
    base_url
        .strip_suffix("/api/")
        .or_else(|| base_url.strip_suffix("/api"))
        .unwrap_or(base_url)
}

/// Turns the path returned by the upload endpoint into an absolute URL
pub fn normalize_upload_url(origin: &str, returned: &str) -> String {
    if returned.starts_with("http") {
        returned.to_string()
    } else if returned.starts_with("/uploads/") {
        format!("{origin}{returned}")
    } else {
        format!("{origin}/{}", returned.trim_start_matches('/'))
    }
}

/// Uploads a product image and returns the URL to store on the product
pub async fn upload_image(
    api: &ApiClient,
    file_name: &str,
    content_type: Option<&str>,
    bytes: Vec<u8>,
) -> Result<String> {
    let returned = api.upload(file_name, content_type, bytes).await?;
    let url = normalize_upload_url(api_origin(api.base_url()), &returned);
    tracing::info!(file_name, url = %url, "Image uploaded");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::product;
    use crate::config::ApiConfig;
    use crate::platform::{HttpMethod, MemoryNetwork, RequestBody};
    use serde_json::json;
    use std::sync::Arc;

    fn catalog() -> Vec<Product> {
        let mut mug = product(1, "Mug", 300.0);
        mug.category = "Home".into();
        mug.stock = 4;
        let mut speaker = product(2, "Speaker", 1500.0);
        speaker.description = "Portable bluetooth speaker".into();
        speaker.stock = 0;
        let mut cable = product(3, "Cable", 150.0);
        cable.stock = 25;
        vec![mug, speaker, cable]
    }

    fn ids(list: &[Product]) -> Vec<i64> {
        list.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_default_sort_is_newest_id() {
        let out = AdminProductFilter::default().apply(&catalog());
        assert_eq!(ids(&out), vec![3, 2, 1]);
    }

    #[test]
    fn test_filter_and_sort() {
        let filter = AdminProductFilter {
            q: "BLUETOOTH".into(),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&catalog())), vec![2]);

        let filter = AdminProductFilter {
            category: "Audio".into(),
            sort: AdminSort::StockDesc,
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&catalog())), vec![3, 2]);

        let filter = AdminProductFilter {
            sort: "priceAsc".parse().unwrap(),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&catalog())), vec![3, 1, 2]);
        assert!("newest".parse::<AdminSort>().is_err());
    }

    #[test]
    fn test_upload_url_normalisation() {
        assert_eq!(api_origin("http://localhost:5000/api"), "http://localhost:5000");
        assert_eq!(api_origin("http://localhost:5000/api/"), "http://localhost:5000");
        assert_eq!(api_origin("https://shop.test"), "https://shop.test");

        let origin = "http://localhost:5000";
        assert_eq!(
            normalize_upload_url(origin, "https://cdn.test/a.png"),
            "https://cdn.test/a.png"
        );
        assert_eq!(
            normalize_upload_url(origin, "/uploads/a.png"),
            "http://localhost:5000/uploads/a.png"
        );
        assert_eq!(
            normalize_upload_url(origin, "//media/a.png"),
            "http://localhost:5000/media/a.png"
        );
    }

    #[tokio::test]
    async fn test_upload_image() {
        let network = Arc::new(MemoryNetwork::new("http://localhost:5000/api"));
        network.respond_json(
            HttpMethod::Post,
            "/upload",
            200,
            json!({"imageUrl": "/uploads/mug.png"}),
        );
        let api = ApiClient::new(network.clone(), &ApiConfig::default());

        let url = upload_image(&api, "mug.png", Some("image/png"), vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:5000/uploads/mug.png");

        let sent = &network.requests_to(HttpMethod::Post, "/upload")[0];
        assert!(matches!(
            &sent.body,
            Some(RequestBody::Multipart { field, .. }) if field == "file"
        ));
    }
}
