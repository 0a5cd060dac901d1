// src/lib.rs

//! Storefront Core - client state for an online shop over a remote REST API
//!
//! Cart pricing, catalog and admin order pipelines, session state decoded
//! from bearer tokens, and route guards. All stores hang off
//! [`app::Storefront`].

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::result_large_err)]

pub mod admin;
pub mod api;
pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod manager;
pub mod notifications;
pub mod platform;
pub mod shop;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use app::Storefront;
pub use error::{Error, ErrorKind, Result, ResultExt};
pub use manager::{Manager, ManagerState, ManagerStatus};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
