//! Biblio Library Circulation Backend
//!
//! A Rust implementation of a library circulation server: copy inventory,
//! loan ledger, FIFO reservation queues, atomic cart checkout and a
//! background expiry sweeper, over Postgres.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
