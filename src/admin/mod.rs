// src/admin/mod.rs

//! Admin console: order management and the product list

pub mod orders;
pub mod products;

pub use orders::{
    csv_file_name, export_csv, filter_orders, summarize, AdminOrdersStore, AdminOrdersView,
    OrderFilter, OrderSummary, Pagination,
};
pub use products::{api_origin, normalize_upload_url, upload_image, AdminProductFilter, AdminSort};
