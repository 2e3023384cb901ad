//! Lending Library
//!
//! Book inventory with multi-word search and checkout/return rules, served
//! as a small REST JSON API. Storage is either in process or PostgreSQL.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use services::LendingLibrary;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<LendingLibrary>,
}
