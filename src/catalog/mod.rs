// src/catalog/mod.rs

//! Product catalog: models, the listing store, the client-side filter
//! pipeline and the review cache

pub mod filter;
pub mod models;
pub mod reviews;
pub mod store;

pub use filter::{apply, todays_deals, CatalogFilter, CatalogView, SortMode};
pub use models::{Product, ProductDraft, ProductPage, ProductQuery, Review};
pub use reviews::ReviewCache;
pub use store::{CatalogStore, PageInfo};
